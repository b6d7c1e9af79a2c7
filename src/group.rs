//! Grouping staged images by CRS.

use std::path::PathBuf;

/// An image ready for a mosaic, with the CRS it will be grouped under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub path: PathBuf,
    pub crs: String,
}

/// Images sharing one CRS display name, in staging order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrsGroup {
    pub crs: String,
    pub members: Vec<PathBuf>,
}

/// Stable-sort by CRS name and split into maximal runs of equal names.
///
/// Every group is non-empty and the groups partition the input exactly.
pub fn group_by_crs(mut staged: Vec<StagedImage>) -> Vec<CrsGroup> {
    staged.sort_by(|a, b| a.crs.cmp(&b.crs));

    let mut groups: Vec<CrsGroup> = Vec::new();
    for image in staged {
        match groups.last_mut() {
            Some(group) if group.crs == image.crs => group.members.push(image.path),
            _ => groups.push(CrsGroup {
                crs: image.crs,
                members: vec![image.path],
            }),
        }
    }
    groups
}
