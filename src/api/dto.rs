//! Wire types for the lottery service and their conversion into domain
//! records.
//!
//! The upstream schema is inconsistent in two ways this module absorbs:
//! drawn numbers arrive as single space-delimited strings, and the
//! prize-breakdown sub-fields arrive as null, an object, or a bare
//! primitive depending on the draw. Decoding inspects the raw JSON node
//! kind before structural decoding and degrades unusable shapes to absent
//! rather than failing the envelope.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::api::ApiError;
use crate::models::{DrawRecord, PrizeTier, WinnerDetail};

/// Application-level status code denoting success.
pub const ENVELOPE_SUCCESS: i32 = 1;

/// Outer response wrapper: `{ code, msg, time, data }`.
///
/// `data` is optional because failure envelopes omit or null it. The
/// payload type is only decoded when `code` signals success; whatever a
/// failure envelope puts in `data` is discarded so the application-level
/// `msg` always survives decoding.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub code: i32,
    pub msg: String,
    pub time: String,
    pub data: Option<T>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Envelope<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawEnvelope {
            code: i32,
            #[serde(default)]
            msg: String,
            #[serde(default)]
            time: String,
            #[serde(default)]
            data: Option<Value>,
        }

        let raw = RawEnvelope::deserialize(deserializer)?;
        let data = match raw.data {
            Some(value) if raw.code == ENVELOPE_SUCCESS => {
                Some(T::deserialize(value).map_err(serde::de::Error::custom)?)
            }
            _ => None,
        };
        Ok(Envelope {
            code: raw.code,
            msg: raw.msg,
            time: raw.time,
            data,
        })
    }
}

impl<T> Envelope<T> {
    /// Split the envelope into payload or application-level error.
    pub fn into_payload(self) -> Result<T, ApiError> {
        if self.code != ENVELOPE_SUCCESS {
            return Err(ApiError::Service {
                code: self.code,
                msg: self.msg,
            });
        }
        self.data.ok_or(ApiError::EmptyPayload)
    }
}

/// One drawing as transmitted by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct DrawPayload {
    #[serde(rename = "type")]
    pub game_type: String,
    pub name: String,
    pub code: String,
    pub issue: String,
    /// Space-delimited primary numbers, e.g. `"03 07 11 18 24 30"`.
    pub red: String,
    /// Space-delimited secondary numbers; may be empty.
    pub blue: String,
    #[serde(rename = "drawdate")]
    pub draw_date: String,
    #[serde(rename = "time_rule")]
    pub time_rule: String,
    #[serde(rename = "sale_money", default)]
    pub sale_money: Option<String>,
    #[serde(rename = "prize_pool", default)]
    pub prize_pool: Option<String>,
    #[serde(rename = "red_order", default)]
    pub red_order: Option<String>,
    #[serde(rename = "blue_order", default)]
    pub blue_order: Option<String>,
    #[serde(rename = "winner_detail", default)]
    pub winner_detail: Option<Vec<WinnerDetailPayload>>,
}

impl DrawPayload {
    /// Convert to the domain record, splitting number strings into ordered
    /// token sequences. Token order is preserved exactly as transmitted.
    pub fn into_record(self) -> DrawRecord {
        DrawRecord {
            game_type: self.game_type,
            name: self.name,
            code: self.code,
            issue: self.issue,
            red: split_numbers(&self.red),
            blue: split_numbers(&self.blue),
            draw_date: self.draw_date,
            time_rule: self.time_rule,
            sale_money: self.sale_money,
            prize_pool: self.prize_pool,
            winner_detail: self
                .winner_detail
                .map(|details| details.into_iter().map(|d| d.into_detail()).collect()),
        }
    }
}

/// Split a space-delimited number string into non-blank tokens,
/// discarding empty tokens from repeated delimiters.
fn split_numbers(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WinnerDetailPayload {
    #[serde(rename = "awardEtc", default)]
    pub award_etc: String,
    #[serde(rename = "baseBetWinner", default, deserialize_with = "tolerant_tier")]
    pub base_bet_winner: Option<PrizeTierPayload>,
    #[serde(rename = "addToBetWinner", default, deserialize_with = "tolerant_tier")]
    pub add_to_bet_winner: Option<PrizeTierPayload>,
    #[serde(rename = "addToBetWinner2", default, deserialize_with = "tolerant_tier")]
    pub add_to_bet_winner2: Option<PrizeTierPayload>,
    #[serde(rename = "addToBetWinner3", default, deserialize_with = "tolerant_tier")]
    pub add_to_bet_winner3: Option<PrizeTierPayload>,
}

impl WinnerDetailPayload {
    pub fn into_detail(self) -> WinnerDetail {
        WinnerDetail {
            award_etc: self.award_etc,
            base_bet_winner: self.base_bet_winner.map(|t| t.into_tier()),
            add_to_bet_winner: self.add_to_bet_winner.map(|t| t.into_tier()),
            add_to_bet_winner2: self.add_to_bet_winner2.map(|t| t.into_tier()),
            add_to_bet_winner3: self.add_to_bet_winner3.map(|t| t.into_tier()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PrizeTierPayload {
    #[serde(default)]
    pub remark: String,
    #[serde(rename = "awardNum", default)]
    pub award_num: String,
    #[serde(rename = "awardMoney", default)]
    pub award_money: String,
    #[serde(rename = "totalMoney", default)]
    pub total_money: String,
}

impl PrizeTierPayload {
    pub fn into_tier(self) -> PrizeTier {
        PrizeTier {
            remark: self.remark,
            award_num: self.award_num,
            award_money: self.award_money,
            total_money: self.total_money,
        }
    }
}

/// Tolerant-union decode for a prize-tier sub-field.
///
/// The upstream service sends these as null, an object, or - observed in
/// practice - a bare string carrying no usable structure. The raw JSON node
/// kind is inspected first: only an object is decoded structurally, and an
/// object that fails structural decode degrades to absent as well, so this
/// function is total over every JSON shape.
fn tolerant_tier<'de, D>(deserializer: D) -> Result<Option<PrizeTierPayload>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Object(_) => Ok(serde_json::from_value(value).ok()),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_json(red: &str, blue: &str) -> String {
        format!(
            r#"{{
                "type": "福彩",
                "name": "福彩3D",
                "code": "fc3d",
                "issue": "2024151",
                "red": "{red}",
                "blue": "{blue}",
                "drawdate": "2024-06-08",
                "time_rule": "每天21:15"
            }}"#
        )
    }

    #[test]
    fn test_split_preserves_transmitted_order() {
        let payload: DrawPayload = serde_json::from_str(&payload_json("3 7 1", "")).unwrap();
        let record = payload.into_record();
        assert_eq!(record.red, vec!["3", "7", "1"]);
        assert!(record.blue.is_empty());
    }

    #[test]
    fn test_split_discards_repeated_delimiters() {
        let payload: DrawPayload =
            serde_json::from_str(&payload_json("03  07   11", " 12 ")).unwrap();
        let record = payload.into_record();
        assert_eq!(record.red, vec!["03", "07", "11"]);
        assert_eq!(record.blue, vec!["12"]);
    }

    #[test]
    fn test_optional_fields_default_to_absent() {
        let payload: DrawPayload = serde_json::from_str(&payload_json("1 2 3", "")).unwrap();
        assert_eq!(payload.sale_money, None);
        assert_eq!(payload.prize_pool, None);
        assert!(payload.winner_detail.is_none());
    }

    #[test]
    fn test_tolerant_tier_object_null_and_string() {
        let json = r#"{
            "awardEtc": "一等奖",
            "baseBetWinner": {
                "remark": "基本",
                "awardNum": "5",
                "awardMoney": "8000000",
                "totalMoney": "40000000"
            },
            "addToBetWinner": null,
            "addToBetWinner2": "N/A",
            "addToBetWinner3": 0
        }"#;
        let detail: WinnerDetailPayload = serde_json::from_str(json).unwrap();
        let base = detail.base_bet_winner.as_ref().unwrap();
        assert_eq!(base.award_num, "5");
        assert_eq!(base.award_money, "8000000");
        assert!(detail.add_to_bet_winner.is_none());
        assert!(detail.add_to_bet_winner2.is_none());
        assert!(detail.add_to_bet_winner3.is_none());
    }

    #[test]
    fn test_tolerant_tier_missing_fields_default_to_empty() {
        let json = r#"{ "awardEtc": "二等奖", "baseBetWinner": { "awardNum": "120" } }"#;
        let detail: WinnerDetailPayload = serde_json::from_str(json).unwrap();
        let base = detail.base_bet_winner.unwrap();
        assert_eq!(base.award_num, "120");
        assert_eq!(base.remark, "");
        assert_eq!(base.total_money, "");
    }

    #[test]
    fn test_tolerant_tier_absent_field() {
        let json = r#"{ "awardEtc": "三等奖" }"#;
        let detail: WinnerDetailPayload = serde_json::from_str(json).unwrap();
        assert!(detail.base_bet_winner.is_none());
        assert!(detail.add_to_bet_winner3.is_none());
    }

    #[test]
    fn test_envelope_success_yields_payload() {
        let json = format!(
            r#"{{ "code": 1, "msg": "ok", "time": "2024-06-08 21:30:00", "data": {} }}"#,
            payload_json("1 2 3", "4")
        );
        let envelope: Envelope<DrawPayload> = serde_json::from_str(&json).unwrap();
        let payload = envelope.into_payload().unwrap();
        assert_eq!(payload.issue, "2024151");
    }

    #[test]
    fn test_envelope_failure_carries_message() {
        let json = r#"{ "code": 0, "msg": "apikey invalid", "time": "", "data": null }"#;
        let envelope: Envelope<DrawPayload> = serde_json::from_str(&json).unwrap();
        match envelope.into_payload() {
            Err(ApiError::Service { code, msg }) => {
                assert_eq!(code, 0);
                assert_eq!(msg, "apikey invalid");
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_failure_with_junk_data_keeps_message() {
        // Failure envelopes sometimes carry a data shape incompatible with
        // the payload type; the service message must survive anyway.
        let json = r#"{ "code": -1, "msg": "quota exceeded", "time": "", "data": "" }"#;
        let envelope: Envelope<DrawPayload> = serde_json::from_str(json).unwrap();
        match envelope.into_payload() {
            Err(ApiError::Service { code, msg }) => {
                assert_eq!(code, -1);
                assert_eq!(msg, "quota exceeded");
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_success_with_incompatible_data_fails_decode() {
        let json = r#"{ "code": 1, "msg": "", "time": "", "data": "not an object" }"#;
        assert!(serde_json::from_str::<Envelope<DrawPayload>>(json).is_err());
    }

    #[test]
    fn test_envelope_success_without_data() {
        let json = r#"{ "code": 1, "msg": "ok", "time": "" }"#;
        let envelope: Envelope<DrawPayload> = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            envelope.into_payload(),
            Err(ApiError::EmptyPayload)
        ));
    }

    #[test]
    fn test_full_record_conversion() {
        let json = r#"{
            "type": "福彩",
            "name": "双色球",
            "code": "ssq",
            "issue": "2024066",
            "red": "03 07 11 18 24 30",
            "blue": "12",
            "drawdate": "2024-06-09",
            "time_rule": "每周二四日21:15",
            "sale_money": "350000000",
            "prize_pool": "2400000000",
            "winner_detail": [
                { "awardEtc": "一等奖", "baseBetWinner": { "awardNum": "7" } }
            ]
        }"#;
        let payload: DrawPayload = serde_json::from_str(json).unwrap();
        let record = payload.into_record();
        assert_eq!(record.code, "ssq");
        assert_eq!(record.red.len(), 6);
        assert_eq!(record.blue, vec!["12"]);
        assert_eq!(record.sale_money.as_deref(), Some("350000000"));
        let details = record.winner_detail.unwrap();
        assert_eq!(details[0].award_etc, "一等奖");
        assert_eq!(
            details[0].base_bet_winner.as_ref().unwrap().award_num,
            "7"
        );
    }
}
