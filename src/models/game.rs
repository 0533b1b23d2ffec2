use std::ops::RangeInclusive;

/// The fixed set of known lottery variants and their number rules.
///
/// The repository only uses this to reject unknown codes up front; the
/// per-game digit rules are provided for downstream consumers (verification,
/// display) and carry no behavior inside the cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameKind {
    /// 双色球
    Ssq,
    /// 七乐彩
    Qlc,
    /// 福彩3D
    Fc3d,
    /// 超级大乐透
    Cjdlt,
    /// 七星彩
    Qxc,
    /// 排列3
    Pl3,
    /// 排列5
    Pl5,
    /// 快乐8
    Kl8,
}

impl GameKind {
    pub const ALL: [GameKind; 8] = [
        GameKind::Ssq,
        GameKind::Qlc,
        GameKind::Fc3d,
        GameKind::Cjdlt,
        GameKind::Qxc,
        GameKind::Pl3,
        GameKind::Pl5,
        GameKind::Kl8,
    ];

    pub fn from_code(code: &str) -> Option<GameKind> {
        GameKind::ALL.iter().copied().find(|k| k.code() == code)
    }

    /// Wire code used in API requests and storage rows.
    pub fn code(&self) -> &'static str {
        match self {
            GameKind::Ssq => "ssq",
            GameKind::Qlc => "qlc",
            GameKind::Fc3d => "fc3d",
            GameKind::Cjdlt => "cjdlt",
            GameKind::Qxc => "7xc",
            GameKind::Pl3 => "pl3",
            GameKind::Pl5 => "pl5",
            GameKind::Kl8 => "kl8",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GameKind::Ssq => "双色球",
            GameKind::Qlc => "七乐彩",
            GameKind::Fc3d => "福彩3D",
            GameKind::Cjdlt => "超级大乐透",
            GameKind::Qxc => "七星彩",
            GameKind::Pl3 => "排列3",
            GameKind::Pl5 => "排列5",
            GameKind::Kl8 => "快乐8",
        }
    }

    /// Issuing category: welfare (福彩) or sports (体彩) lottery.
    pub fn category(&self) -> &'static str {
        match self {
            GameKind::Ssq | GameKind::Qlc | GameKind::Fc3d | GameKind::Kl8 => "福彩",
            GameKind::Cjdlt | GameKind::Qxc | GameKind::Pl3 | GameKind::Pl5 => "体彩",
        }
    }

    pub fn red_count(&self) -> usize {
        match self {
            GameKind::Ssq => 6,
            GameKind::Qlc => 7,
            GameKind::Fc3d => 3,
            GameKind::Cjdlt => 5,
            GameKind::Qxc => 7,
            GameKind::Pl3 => 3,
            GameKind::Pl5 => 5,
            GameKind::Kl8 => 20,
        }
    }

    pub fn red_range(&self) -> RangeInclusive<u8> {
        match self {
            GameKind::Ssq => 1..=33,
            GameKind::Qlc => 1..=30,
            GameKind::Cjdlt => 1..=35,
            GameKind::Kl8 => 1..=80,
            GameKind::Fc3d | GameKind::Qxc | GameKind::Pl3 | GameKind::Pl5 => 0..=9,
        }
    }

    pub fn blue_count(&self) -> usize {
        match self {
            GameKind::Ssq => 1,
            GameKind::Cjdlt => 2,
            _ => 0,
        }
    }

    pub fn blue_range(&self) -> Option<RangeInclusive<u8>> {
        match self {
            GameKind::Ssq => Some(1..=16),
            GameKind::Cjdlt => Some(1..=12),
            _ => None,
        }
    }

    /// True for positional-digit games where drawn-number order is
    /// semantically significant and must never be re-sorted.
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            GameKind::Fc3d | GameKind::Qxc | GameKind::Pl3 | GameKind::Pl5
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_round_trips() {
        for kind in GameKind::ALL {
            assert_eq!(GameKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(GameKind::from_code("powerball"), None);
    }

    #[test]
    fn test_positional_games() {
        assert!(GameKind::Fc3d.is_positional());
        assert!(GameKind::Pl5.is_positional());
        assert!(!GameKind::Ssq.is_positional());
        assert!(!GameKind::Kl8.is_positional());
    }

    #[test]
    fn test_number_rules() {
        assert_eq!(GameKind::Ssq.red_count(), 6);
        assert_eq!(GameKind::Ssq.blue_count(), 1);
        assert_eq!(GameKind::Ssq.blue_range(), Some(1..=16));
        assert_eq!(GameKind::Qlc.blue_range(), None);
        assert_eq!(GameKind::Kl8.red_range(), 1..=80);
    }
}
