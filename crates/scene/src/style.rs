use std::fmt;
use std::str::FromStr;

/// Named base map styles offered by the surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum MapStyle {
    #[default]
    Outdoors,
    Satellite,
    Streets,
    Light,
    Dark,
}

impl MapStyle {
    pub const ALL: [MapStyle; 5] = [
        MapStyle::Outdoors,
        MapStyle::Satellite,
        MapStyle::Streets,
        MapStyle::Light,
        MapStyle::Dark,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MapStyle::Outdoors => "outdoors",
            MapStyle::Satellite => "satellite",
            MapStyle::Streets => "streets",
            MapStyle::Light => "light",
            MapStyle::Dark => "dark",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MapStyle::Outdoors => "Outdoors",
            MapStyle::Satellite => "Satellite",
            MapStyle::Streets => "Streets",
            MapStyle::Light => "Light",
            MapStyle::Dark => "Dark",
        }
    }

    pub fn url(self) -> &'static str {
        match self {
            MapStyle::Outdoors => "mapbox://styles/mapbox/outdoors-v12",
            MapStyle::Satellite => "mapbox://styles/mapbox/satellite-streets-v12",
            MapStyle::Streets => "mapbox://styles/mapbox/streets-v12",
            MapStyle::Light => "mapbox://styles/mapbox/light-v11",
            MapStyle::Dark => "mapbox://styles/mapbox/dark-v11",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn from_url(url: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.url() == url.trim())
    }
}

impl fmt::Display for MapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStyle(pub String);

impl fmt::Display for UnknownStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown map style: {}", self.0)
    }
}

impl std::error::Error for UnknownStyle {}

/// Accepts either a style name or its URL.
impl FromStr for MapStyle {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
            .or_else(|| Self::from_url(s))
            .ok_or_else(|| UnknownStyle(s.to_string()))
    }
}
