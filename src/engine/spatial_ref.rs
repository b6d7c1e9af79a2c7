//! Spatial references and their display names.
//!
//! Grouping compares CRS *display names*, so every path that produces a name
//! (a `.prj` sidecar, GeoTIFF keys, or synthetic georeferencing) goes through
//! [`display_name`] to land on the same spelling.

use std::fmt;

/// Display name assigned to rasters georeferenced from the attribute table.
pub const WEB_MERCATOR_NAME: &str = "WGS 1984 Web Mercator (auxiliary sphere)";

/// ESRI WKT for EPSG:3857, written as the `.prj` of synthetically georeferenced rasters.
pub const WEB_MERCATOR_WKT: &str = concat!(
    r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere","#,
    r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],"#,
    r#"PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],"#,
    r#"PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],"#,
    r#"PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],"#,
    r#"PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],"#,
    r#"UNIT["Meter",1.0]]"#,
);

/// A coordinate reference system as the engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialReference {
    pub name: String,
    pub epsg: Option<u16>,
    pub wkt: String,
}

impl SpatialReference {
    /// WGS 1984 Web Mercator (auxiliary sphere), EPSG:3857.
    pub fn web_mercator() -> Self {
        Self {
            name: WEB_MERCATOR_NAME.to_string(),
            epsg: Some(3857),
            wkt: WEB_MERCATOR_WKT.to_string(),
        }
    }

    /// Look up an EPSG code in the bundled definition database.
    pub fn from_epsg(code: u16) -> Option<Self> {
        if code == 3857 {
            return Some(Self::web_mercator());
        }
        let def = crs_definitions::from_code(code)?;
        let name = wkt_name(def.wkt)?;
        Some(Self {
            name,
            epsg: Some(code),
            wkt: def.wkt.to_string(),
        })
    }

    /// A CRS known only by name, e.g. from a GeoTIFF citation.
    ///
    /// Written out as a `LOCAL_CS` so the name survives a `.prj` round trip.
    pub fn local(name: impl Into<String>) -> Self {
        let name = name.into();
        let wkt = format!("LOCAL_CS[\"{}\"]", name.replace('"', "'"));
        Self {
            name,
            epsg: None,
            wkt,
        }
    }

    /// Build from WKT text, e.g. the contents of a `.prj` file.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        let name = wkt_name(wkt)?;
        Some(Self {
            name,
            epsg: None,
            wkt: wkt.trim().to_string(),
        })
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "{} (EPSG:{})", self.name, code),
            None => f.write_str(&self.name),
        }
    }
}

const ROOT_KEYWORDS: &[&str] = &[
    "PROJCS", "GEOGCS", "GEOCCS", "COMPD_CS", "LOCAL_CS", "PROJCRS", "GEOGCRS", "GEODCRS",
    "COMPOUNDCRS",
];

/// Extract the display name of the outermost CRS in a WKT string.
///
/// Returns `None` when the text is not recognizable WKT.
pub fn wkt_name(wkt: &str) -> Option<String> {
    let trimmed = wkt.trim_start();
    let keyword_end = trimmed.find(['[', '('])?;
    let keyword = trimmed[..keyword_end].trim().to_ascii_uppercase();
    if !ROOT_KEYWORDS.contains(&keyword.as_str()) {
        return None;
    }
    let rest = &trimmed[keyword_end + 1..];
    let open = rest.find('"')?;
    let close = rest[open + 1..].find('"')? + open + 1;
    let raw = &rest[open + 1..close];
    if raw.trim().is_empty() {
        return None;
    }
    Some(display_name(raw))
}

/// Normalize a raw CRS name into its display form.
///
/// ESRI names spell spaces as underscores (`GCS_North_American_1983`); those
/// are shown with spaces. The Web Mercator auxiliary-sphere name is mapped to
/// [`WEB_MERCATOR_NAME`] so it groups with synthetically georeferenced rasters.
pub fn display_name(raw: &str) -> String {
    let spaced = raw.trim().replace('_', " ");
    if spaced.eq_ignore_ascii_case("WGS 1984 Web Mercator Auxiliary Sphere") {
        return WEB_MERCATOR_NAME.to_string();
    }
    spaced
}
