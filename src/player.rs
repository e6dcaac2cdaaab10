// ⚾ Player Entity - natural key + fixed positional CSV schema
//
// The source snapshot is a 24-column CSV. PlayerField::ALL is the single
// column-index → field table; nothing else in the crate indexes rows by number.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// COLUMN SCHEMA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Natural key (column 0)
    Key,
    /// Coerced to i32, absent when empty or unparsable
    Integer,
    /// Passed through as-is
    Text,
}

/// One column of the player snapshot, in source order.
///
/// Discriminants follow declaration order, so `field as usize` is the
/// column index. Keep the variants and `ALL` in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerField {
    PlayerId,
    BirthYear,
    BirthMonth,
    BirthDay,
    BirthCountry,
    BirthState,
    BirthCity,
    DeathYear,
    DeathMonth,
    DeathDay,
    DeathCountry,
    DeathState,
    DeathCity,
    NameFirst,
    NameLast,
    NameGiven,
    Weight,
    Height,
    Bats,
    Throws,
    Debut,
    FinalGame,
    RetroId,
    BbrefId,
}

impl PlayerField {
    pub const COUNT: usize = 24;

    pub const ALL: [PlayerField; PlayerField::COUNT] = [
        PlayerField::PlayerId,
        PlayerField::BirthYear,
        PlayerField::BirthMonth,
        PlayerField::BirthDay,
        PlayerField::BirthCountry,
        PlayerField::BirthState,
        PlayerField::BirthCity,
        PlayerField::DeathYear,
        PlayerField::DeathMonth,
        PlayerField::DeathDay,
        PlayerField::DeathCountry,
        PlayerField::DeathState,
        PlayerField::DeathCity,
        PlayerField::NameFirst,
        PlayerField::NameLast,
        PlayerField::NameGiven,
        PlayerField::Weight,
        PlayerField::Height,
        PlayerField::Bats,
        PlayerField::Throws,
        PlayerField::Debut,
        PlayerField::FinalGame,
        PlayerField::RetroId,
        PlayerField::BbrefId,
    ];

    /// Column name as it appears in the snapshot header and in JSON
    pub fn name(self) -> &'static str {
        match self {
            PlayerField::PlayerId => "playerID",
            PlayerField::BirthYear => "birthYear",
            PlayerField::BirthMonth => "birthMonth",
            PlayerField::BirthDay => "birthDay",
            PlayerField::BirthCountry => "birthCountry",
            PlayerField::BirthState => "birthState",
            PlayerField::BirthCity => "birthCity",
            PlayerField::DeathYear => "deathYear",
            PlayerField::DeathMonth => "deathMonth",
            PlayerField::DeathDay => "deathDay",
            PlayerField::DeathCountry => "deathCountry",
            PlayerField::DeathState => "deathState",
            PlayerField::DeathCity => "deathCity",
            PlayerField::NameFirst => "nameFirst",
            PlayerField::NameLast => "nameLast",
            PlayerField::NameGiven => "nameGiven",
            PlayerField::Weight => "weight",
            PlayerField::Height => "height",
            PlayerField::Bats => "bats",
            PlayerField::Throws => "throws",
            PlayerField::Debut => "debut",
            PlayerField::FinalGame => "finalGame",
            PlayerField::RetroId => "retroID",
            PlayerField::BbrefId => "bbrefID",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            PlayerField::PlayerId => ColumnKind::Key,
            PlayerField::BirthYear
            | PlayerField::BirthMonth
            | PlayerField::BirthDay
            | PlayerField::DeathYear
            | PlayerField::DeathMonth
            | PlayerField::DeathDay
            | PlayerField::Weight
            | PlayerField::Height => ColumnKind::Integer,
            _ => ColumnKind::Text,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Case-insensitive lookup by column name
    pub fn from_name(name: &str) -> Option<PlayerField> {
        let name = name.trim();
        PlayerField::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }
}

// ============================================================================
// PLAYER ENTITY
// ============================================================================

/// Player record
///
/// Identity: `player_id` (natural key from the source snapshot).
/// `id` is the surrogate assigned by the store on first insert and never
/// changes afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "playerID")]
    pub player_id: String,

    // Birth
    pub birth_year: Option<i32>,
    pub birth_month: Option<i32>,
    pub birth_day: Option<i32>,
    pub birth_country: String,
    pub birth_state: String,
    pub birth_city: String,

    // Death
    pub death_year: Option<i32>,
    pub death_month: Option<i32>,
    pub death_day: Option<i32>,
    pub death_country: String,
    pub death_state: String,
    pub death_city: String,

    // Names
    pub name_first: String,
    pub name_last: String,
    pub name_given: String,

    // Physical
    pub weight: Option<i32>,
    pub height: Option<i32>,
    pub bats: String,
    pub throws: String,

    // Career
    pub debut: String,
    pub final_game: String,

    #[serde(rename = "retroID")]
    pub retro_id: String,

    #[serde(rename = "bbrefID")]
    pub bbref_id: String,
}

impl Player {
    /// Fresh record shell with only the key stamped on it
    pub fn new(player_id: impl Into<String>) -> Self {
        Player {
            player_id: player_id.into(),
            ..Default::default()
        }
    }

    /// Mutable slot for an integer column, `None` for other kinds
    pub fn integer_mut(&mut self, field: PlayerField) -> Option<&mut Option<i32>> {
        match field {
            PlayerField::BirthYear => Some(&mut self.birth_year),
            PlayerField::BirthMonth => Some(&mut self.birth_month),
            PlayerField::BirthDay => Some(&mut self.birth_day),
            PlayerField::DeathYear => Some(&mut self.death_year),
            PlayerField::DeathMonth => Some(&mut self.death_month),
            PlayerField::DeathDay => Some(&mut self.death_day),
            PlayerField::Weight => Some(&mut self.weight),
            PlayerField::Height => Some(&mut self.height),
            _ => None,
        }
    }

    /// Mutable slot for a text column (the key included)
    pub fn text_mut(&mut self, field: PlayerField) -> Option<&mut String> {
        match field {
            PlayerField::PlayerId => Some(&mut self.player_id),
            PlayerField::BirthCountry => Some(&mut self.birth_country),
            PlayerField::BirthState => Some(&mut self.birth_state),
            PlayerField::BirthCity => Some(&mut self.birth_city),
            PlayerField::DeathCountry => Some(&mut self.death_country),
            PlayerField::DeathState => Some(&mut self.death_state),
            PlayerField::DeathCity => Some(&mut self.death_city),
            PlayerField::NameFirst => Some(&mut self.name_first),
            PlayerField::NameLast => Some(&mut self.name_last),
            PlayerField::NameGiven => Some(&mut self.name_given),
            PlayerField::Bats => Some(&mut self.bats),
            PlayerField::Throws => Some(&mut self.throws),
            PlayerField::Debut => Some(&mut self.debut),
            PlayerField::FinalGame => Some(&mut self.final_game),
            PlayerField::RetroId => Some(&mut self.retro_id),
            PlayerField::BbrefId => Some(&mut self.bbref_id),
            _ => None,
        }
    }

    pub fn integer(&self, field: PlayerField) -> Option<i32> {
        match field {
            PlayerField::BirthYear => self.birth_year,
            PlayerField::BirthMonth => self.birth_month,
            PlayerField::BirthDay => self.birth_day,
            PlayerField::DeathYear => self.death_year,
            PlayerField::DeathMonth => self.death_month,
            PlayerField::DeathDay => self.death_day,
            PlayerField::Weight => self.weight,
            PlayerField::Height => self.height,
            _ => None,
        }
    }

    pub fn text(&self, field: PlayerField) -> Option<&str> {
        match field {
            PlayerField::PlayerId => Some(&self.player_id),
            PlayerField::BirthCountry => Some(&self.birth_country),
            PlayerField::BirthState => Some(&self.birth_state),
            PlayerField::BirthCity => Some(&self.birth_city),
            PlayerField::DeathCountry => Some(&self.death_country),
            PlayerField::DeathState => Some(&self.death_state),
            PlayerField::DeathCity => Some(&self.death_city),
            PlayerField::NameFirst => Some(&self.name_first),
            PlayerField::NameLast => Some(&self.name_last),
            PlayerField::NameGiven => Some(&self.name_given),
            PlayerField::Bats => Some(&self.bats),
            PlayerField::Throws => Some(&self.throws),
            PlayerField::Debut => Some(&self.debut),
            PlayerField::FinalGame => Some(&self.final_game),
            PlayerField::RetroId => Some(&self.retro_id),
            PlayerField::BbrefId => Some(&self.bbref_id),
            _ => None,
        }
    }

    /// Short display name, e.g. "David Aardsma"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name_first, self.name_last)
            .trim()
            .to_string()
    }
}

/// Human-readable rendering used in change notifications:
/// `Player{playerID='aardsda01', birthYear=1981, birthMonth=null, ...}`
impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player{{")?;
        if let Some(id) = &self.id {
            write!(f, "id='{}', ", id)?;
        }
        for (i, field) in PlayerField::ALL.iter().copied().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match field.kind() {
                ColumnKind::Integer => match self.integer(field) {
                    Some(value) => write!(f, "{}={}", field.name(), value)?,
                    None => write!(f, "{}=null", field.name())?,
                },
                ColumnKind::Key | ColumnKind::Text => {
                    write!(f, "{}='{}'", field.name(), self.text(field).unwrap_or_default())?
                }
            }
        }
        write!(f, "}}")
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_table_matches_column_indexes() {
        assert_eq!(PlayerField::ALL.len(), PlayerField::COUNT);
        for (i, field) in PlayerField::ALL.iter().enumerate() {
            assert_eq!(field.index(), i, "{:?} is out of position", field);
        }

        let names: HashSet<&str> = PlayerField::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), PlayerField::COUNT, "column names must be unique");
    }

    #[test]
    fn test_field_kinds() {
        let integers = PlayerField::ALL
            .iter()
            .filter(|f| f.kind() == ColumnKind::Integer)
            .count();
        let texts = PlayerField::ALL
            .iter()
            .filter(|f| f.kind() == ColumnKind::Text)
            .count();

        assert_eq!(integers, 8);
        assert_eq!(texts, 15);
        assert_eq!(PlayerField::ALL[0].kind(), ColumnKind::Key);

        // Every column has exactly one slot of its kind
        let mut player = Player::default();
        for field in PlayerField::ALL {
            match field.kind() {
                ColumnKind::Integer => {
                    assert!(player.integer_mut(field).is_some());
                    assert!(player.text_mut(field).is_none());
                }
                ColumnKind::Key | ColumnKind::Text => {
                    assert!(player.text_mut(field).is_some());
                    assert!(player.integer_mut(field).is_none());
                }
            }
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(PlayerField::from_name("playerID"), Some(PlayerField::PlayerId));
        assert_eq!(PlayerField::from_name(" FINALGAME "), Some(PlayerField::FinalGame));
        assert_eq!(PlayerField::from_name("throwsHand"), None);
    }

    #[test]
    fn test_display_renders_absent_integers_as_null() {
        let mut player = Player::new("aardsda01");
        player.birth_year = Some(1981);
        player.name_first = "David".to_string();

        let rendered = player.to_string();
        assert!(rendered.starts_with("Player{playerID='aardsda01', birthYear=1981, birthMonth=null"));
        assert!(rendered.contains("nameFirst='David'"));
        assert!(rendered.ends_with("bbrefID=''}"));

        println!("✅ Display test passed: {}", rendered);
    }

    #[test]
    fn test_json_uses_source_column_names() {
        let mut player = Player::new("abbotje01");
        player.retro_id = "abboj001".to_string();
        player.weight = Some(200);

        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["playerID"], "abbotje01");
        assert_eq!(json["retroID"], "abboj001");
        assert_eq!(json["weight"], 200);
        assert!(json["birthYear"].is_null());
        assert!(json.get("id").is_none());

        let back: Player = serde_json::from_value(json).unwrap();
        assert_eq!(back, player);
    }
}
