//! Click counts (stage 4 rows)

use serde::{Deserialize, Serialize};

/// One link known to the shortening service, with its click count at fetch time
///
/// Field names match both the provider's JSON and the stage 4 header
/// `id,slashtag,shortUrl,clicks`, so the same type decodes list responses
/// and encodes the output table. Extra JSON fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStat {
    /// Provider-assigned id, also the pagination cursor
    pub id: String,
    pub slashtag: String,
    #[serde(rename = "shortUrl")]
    pub short_url: String,
    pub clicks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_provider_json() {
        let json = r#"[{
            "id": "8f2a",
            "title": "teatexts",
            "slashtag": "x1",
            "destination": "http://teatexts.me/20191113-cheng-keating",
            "shortUrl": "go.teatexts.me/x1",
            "domain": {"fullName": "go.teatexts.me"},
            "clicks": 7,
            "createdAt": "2019-11-12T15:00:00.000Z"
        }]"#;
        let links: Vec<LinkStat> = serde_json::from_str(json).unwrap();
        assert_eq!(links[0].id, "8f2a");
        assert_eq!(links[0].short_url, "go.teatexts.me/x1");
        assert_eq!(links[0].clicks, 7);
    }

    #[test]
    fn test_stage_four_header() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .serialize(LinkStat {
                id: "8f2a".to_string(),
                slashtag: "x1".to_string(),
                short_url: "go.teatexts.me/x1".to_string(),
                clicks: 7,
            })
            .unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(text, "id,slashtag,shortUrl,clicks\n8f2a,x1,go.teatexts.me/x1,7\n");
    }
}
