use crate::log; // macro import
use crate::text;
use crate::utils::get_query_param;


const DEFAULT_SKYBOX_URL: &str = "https://sbcode.net/img/";
const DEFAULT_TEXT: &str = "RUST";
const DEFAULT_FOV: f32 = 75.0;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoKind {
    /// Skybox and a single light
    Skybox,
    /// Table, lamp, panel and text with the camera flythrough
    Tabletop,
}
impl DemoKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skybox" => Some(DemoKind::Skybox),
            "tabletop" | "table" => Some(DemoKind::Tabletop),
            _ => None,
        }
    }
}


/// Runtime settings read from the page's query string
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub demo: DemoKind,
    /// Base URL of px/nx/py/ny/pz/nz.png, always ending with '/'
    pub skybox_url: String,
    /// Image shown on the table's panel; a placeholder is drawn if None
    pub panel_url: Option<String>,
    pub fov_degrees: f32,
    pub text: String,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            demo: DemoKind::Tabletop,
            skybox_url: DEFAULT_SKYBOX_URL.to_string(),
            panel_url: None,
            fov_degrees: DEFAULT_FOV,
            text: DEFAULT_TEXT.to_string(),
        }
    }
}
impl Settings {
    /// Reads the settings from `?demo=...&skybox=...&panel=...&fov=...&text=...`
    pub fn from_page() -> Self {
        Self::from_query(|name| {
            let value = get_query_param(name);
            if value.is_empty() { None } else { Some(value) }
        })
    }

    /// Builds the settings from a query lookup, falling back to the defaults
    /// for missing or malformed values
    pub fn from_query<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let mut settings = Settings::default();

        if let Some(demo) = lookup("demo") {
            match DemoKind::parse(&demo) {
                Some(kind) => settings.demo = kind,
                None => log!("Settings::from_query(): unknown demo '{}', using {:?}", demo, settings.demo),
            }
        }

        if let Some(url) = lookup("skybox") {
            let url = url.trim();
            if !url.is_empty() {
                settings.skybox_url = if url.ends_with('/') {
                    url.to_string()
                } else {
                    format!("{}/", url)
                };
            }
        }

        settings.panel_url = lookup("panel")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        if let Some(fov) = lookup("fov") {
            match fov.trim().parse::<f32>() {
                Ok(f) if f > 1.0 && f < 179.0 => settings.fov_degrees = f,
                _ => log!("Settings::from_query(): ignoring fov '{}'", fov),
            }
        }

        if let Some(t) = lookup("text") {
            let t = t.trim().to_ascii_uppercase();
            if t.chars().any(|c| !text::is_supported(c)) {
                log!("Settings::from_query(): '{}' has characters the block font cannot draw", t);
            }
            if !t.is_empty() {
                settings.text = t;
            }
        }

        settings
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn query(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_query(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_without_query() {
        let s = query(&[]);
        assert_eq!(s, Settings::default());
        assert_eq!(s.demo, DemoKind::Tabletop);
        assert_eq!(s.skybox_url, "https://sbcode.net/img/");
        assert!(s.panel_url.is_none());
    }

    #[test]
    fn demo_selection() {
        assert_eq!(query(&[("demo", "skybox")]).demo, DemoKind::Skybox);
        assert_eq!(query(&[("demo", " Table ")]).demo, DemoKind::Tabletop);
    }

    #[test]
    fn unknown_demo_falls_back_to_tabletop() {
        assert_eq!(query(&[("demo", "cube")]).demo, DemoKind::Tabletop);
        assert_eq!(query(&[("demo", "")]).demo, DemoKind::Tabletop);
    }

    #[test]
    fn malformed_fov_keeps_the_default() {
        assert_eq!(query(&[("fov", "abc")]).fov_degrees, 75.0);
        assert_eq!(query(&[("fov", "180")]).fov_degrees, 75.0);
        assert_eq!(query(&[("fov", "1")]).fov_degrees, 75.0);
        assert_eq!(query(&[("fov", " 60 ")]).fov_degrees, 60.0);
    }

    #[test]
    fn skybox_url_gets_trailing_slash() {
        let s = query(&[("skybox", "https://example.com/cube")]);
        assert_eq!(s.skybox_url, "https://example.com/cube/");
        let s = query(&[("skybox", "assets/")]);
        assert_eq!(s.skybox_url, "assets/");
    }

    #[test]
    fn text_is_uppercased() {
        let s = query(&[("text", "hello 42")]);
        assert_eq!(s.text, "HELLO 42");
        let s = query(&[("text", "   ")]);
        assert_eq!(s.text, "RUST");
    }

    #[test]
    fn panel_url_is_optional() {
        assert_eq!(
            query(&[("panel", "page.png")]).panel_url.as_deref(),
            Some("page.png")
        );
        assert!(query(&[("panel", " ")]).panel_url.is_none());
    }
}
