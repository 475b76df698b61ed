use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Container used when the asset URL carries no usable extension.
    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Image => "png",
        }
    }
}

/// Metadata file written next to each downloaded media file (`<id>.meta.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sidecar {
    #[serde(rename = "SourceURL")]
    pub source_url: String,
    #[serde(rename = "AssetURL")]
    pub asset_url: String,
    pub prompt: String,
    pub title: String,
    pub kind: MediaKind,
    pub suggested_base_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_sidecar_field_names() {
        let sidecar = Sidecar {
            source_url: "https://site/g/gen_a1".into(),
            asset_url: "https://cdn.site/gen_a1.mp4".into(),
            prompt: "a cat".into(),
            title: "a cat".into(),
            kind: MediaKind::Video,
            suggested_base_name: "gen_a1--a_cat".into(),
        };
        let value = serde_json::to_value(&sidecar).unwrap();
        assert_eq!(value["SourceURL"], "https://site/g/gen_a1");
        assert_eq!(value["AssetURL"], "https://cdn.site/gen_a1.mp4");
        assert_eq!(value["Kind"], "video");
        assert_eq!(value["SuggestedBaseName"], "gen_a1--a_cat");
        assert_eq!(value["Prompt"], "a cat");
    }
}
