use serde::{Deserialize, Serialize};

/// One lottery drawing, uniquely identified by `(code, issue)`.
///
/// Constructed only by decoding a remote response or reading back a
/// persisted row; all fields are set once and never mutated. `red` and
/// `blue` keep the exact order the numbers were transmitted in - ordering
/// policy (positional vs sortable) belongs to downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRecord {
    /// Game category as transmitted (e.g. "福彩" / "体彩").
    pub game_type: String,
    /// Display name of the game.
    pub name: String,
    /// Lottery variant code (see [`GameKind`](crate::models::GameKind)).
    pub code: String,
    /// Sequence identifier of the drawing; unique per code.
    pub issue: String,
    /// Primary drawn numbers, in transmitted order.
    pub red: Vec<String>,
    /// Secondary drawn numbers; empty for variants without a secondary pool.
    pub blue: Vec<String>,
    pub draw_date: String,
    pub time_rule: String,
    pub sale_money: Option<String>,
    pub prize_pool: Option<String>,
    /// Prize breakdown; may be absent even on a successful fetch.
    pub winner_detail: Option<Vec<WinnerDetail>>,
}

impl DrawRecord {
    /// Stable storage key for this record.
    pub fn storage_id(&self) -> String {
        format!("{}_{}", self.code, self.issue)
    }
}

/// Prize breakdown for one award tier grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerDetail {
    pub award_etc: String,
    pub base_bet_winner: Option<PrizeTier>,
    pub add_to_bet_winner: Option<PrizeTier>,
    pub add_to_bet_winner2: Option<PrizeTier>,
    pub add_to_bet_winner3: Option<PrizeTier>,
}

/// One prize tier; fields arrive as opaque strings and default to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PrizeTier {
    pub remark: String,
    pub award_num: String,
    pub award_money: String,
    pub total_money: String,
}
