//! Tile identifiers for the national grid and the catalog keys derived from them.
//!
//! Two shapes of identifier are valid:
//! - a 4-character coarse reference such as `TQ28`, naming a 10 km cell
//!   (the unit the catalog is organised by);
//! - a 6-character fine reference such as `TQ28ne`, naming one 5 km quadrant
//!   of that cell.
//!
//! The prefix keeps the case it was supplied with. The quadrant suffix is
//! always carried lower-case, which is how the catalog spells it inside
//! archive file names.

use crate::ValidationError;
use std::fmt;

/// Length of a coarse (10 km) reference.
pub const COARSE_LEN: usize = 4;

/// Length of a fine (quadrant) reference.
pub const FINE_LEN: usize = 6;

/// One quadrant of a coarse cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quadrant {
    /// North-east.
    Ne,
    /// South-east.
    Se,
    /// South-west.
    Sw,
    /// North-west.
    Nw,
}

impl Quadrant {
    /// All quadrants in expansion order.
    pub const ALL: [Quadrant; 4] = [Quadrant::Ne, Quadrant::Se, Quadrant::Sw, Quadrant::Nw];

    /// Lower-case suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            Quadrant::Ne => "ne",
            Quadrant::Se => "se",
            Quadrant::Sw => "sw",
            Quadrant::Nw => "nw",
        }
    }

    /// Parse a suffix in any case.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.to_ascii_lowercase().as_str() {
            "ne" => Some(Quadrant::Ne),
            "se" => Some(Quadrant::Se),
            "sw" => Some(Quadrant::Sw),
            "nw" => Some(Quadrant::Nw),
            _ => None,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Key under which the remote catalog lists products: the 4-character prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoarseKey(String);

impl CoarseKey {
    /// The key as it appears in the catalog URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoarseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated grid reference, coarse or fine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId {
    prefix: String,
    quadrant: Option<Quadrant>,
}

impl TileId {
    /// Parse and validate an identifier.
    pub fn parse(id: &str) -> Result<Self, ValidationError> {
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            if id.chars().count() != COARSE_LEN && id.chars().count() != FINE_LEN {
                return Err(ValidationError::TileIdLength(id.to_string()));
            }
            return Err(ValidationError::TileIdCharacters(id.to_string()));
        }

        match id.len() {
            COARSE_LEN => Ok(Self {
                prefix: id.to_string(),
                quadrant: None,
            }),
            FINE_LEN => {
                let (prefix, suffix) = id.split_at(COARSE_LEN);
                let quadrant =
                    Quadrant::from_suffix(suffix).ok_or_else(|| ValidationError::UnknownQuadrant {
                        id: id.to_string(),
                        suffix: suffix.to_string(),
                    })?;
                Ok(Self {
                    prefix: prefix.to_string(),
                    quadrant: Some(quadrant),
                })
            }
            _ => Err(ValidationError::TileIdLength(id.to_string())),
        }
    }

    /// The 4-character prefix, case as supplied.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The quadrant of a fine id.
    pub fn quadrant(&self) -> Option<Quadrant> {
        self.quadrant
    }

    /// Whether this is a 6-character quadrant id.
    pub fn is_fine(&self) -> bool {
        self.quadrant.is_some()
    }

    /// Catalog key covering this tile.
    pub fn coarse_key(&self) -> CoarseKey {
        CoarseKey(self.prefix.clone())
    }

    /// Name as it appears inside catalog file names: prefix + lower-case suffix.
    pub fn formatted_name(&self) -> String {
        match self.quadrant {
            Some(q) => format!("{}{}", self.prefix, q.suffix()),
            None => self.prefix.clone(),
        }
    }

    /// Fine ids covering this tile: the four quadrants of a coarse id, or
    /// the id itself when it is already fine.
    pub fn expand(&self) -> Vec<TileId> {
        match self.quadrant {
            Some(_) => vec![self.clone()],
            None => Quadrant::ALL
                .iter()
                .map(|&q| TileId {
                    prefix: self.prefix.clone(),
                    quadrant: Some(q),
                })
                .collect(),
        }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)?;
        if let Some(q) = self.quadrant {
            f.write_str(q.suffix())?;
        }
        Ok(())
    }
}

impl std::str::FromStr for TileId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// First four characters of a tile id.
pub fn coarse_prefix(id: &str) -> Result<String, ValidationError> {
    Ok(TileId::parse(id)?.prefix)
}

/// Tile id with the quadrant suffix lower-cased and the prefix untouched.
pub fn formatted_name(id: &str) -> Result<String, ValidationError> {
    Ok(TileId::parse(id)?.formatted_name())
}

/// Four fine ids (ne, se, sw, nw) for a coarse id.
pub fn expand(coarse_id: &str) -> Result<Vec<TileId>, ValidationError> {
    let tile = TileId::parse(coarse_id)?;
    if tile.is_fine() {
        return Err(ValidationError::TileIdLength(coarse_id.to_string()));
    }
    Ok(tile.expand())
}

/// Tiles to request for a user-supplied id: all four quadrants for a
/// 4-character id, the id itself for a 6-character one.
pub fn tiles_for_request(id: &str) -> Result<Vec<TileId>, ValidationError> {
    Ok(TileId::parse(id)?.expand())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coarse() {
        let tile = TileId::parse("TQ28").unwrap();
        assert!(!tile.is_fine());
        assert_eq!(tile.prefix(), "TQ28");
        assert_eq!(tile.formatted_name(), "TQ28");
    }

    #[test]
    fn test_parse_fine_lowercases_suffix_only() {
        let tile = TileId::parse("TQ28NE").unwrap();
        assert_eq!(tile.quadrant(), Some(Quadrant::Ne));
        assert_eq!(tile.formatted_name(), "TQ28ne");
        assert_eq!(formatted_name("TQ28NE").unwrap(), "TQ28ne");

        // Prefix case is never touched
        assert_eq!(formatted_name("tq28SW").unwrap(), "tq28sw");
    }

    #[test]
    fn test_invalid_length() {
        for id in ["", "TQ2", "TQ28n", "TQ28nee", "TQ28nenw"] {
            assert!(
                matches!(TileId::parse(id), Err(ValidationError::TileIdLength(_))),
                "{id:?} should be rejected for length"
            );
        }
    }

    #[test]
    fn test_invalid_characters_and_quadrant() {
        assert!(matches!(
            TileId::parse("TQ-8"),
            Err(ValidationError::TileIdCharacters(_))
        ));
        assert!(matches!(
            TileId::parse("TQ28xx"),
            Err(ValidationError::UnknownQuadrant { .. })
        ));
        // Multi-byte characters must not be sliced
        assert!(TileId::parse("TQ2é").is_err());
    }

    #[test]
    fn test_coarse_prefix() {
        assert_eq!(coarse_prefix("TQ28ne").unwrap(), "TQ28");
        assert_eq!(coarse_prefix("TQ28").unwrap(), "TQ28");
        assert_eq!(TileId::parse("TL42nw").unwrap().coarse_key().as_str(), "TL42");
    }

    #[test]
    fn test_expand_coarse() {
        let tiles = expand("TQ28").unwrap();
        let names: Vec<String> = tiles.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, ["TQ28ne", "TQ28se", "TQ28sw", "TQ28nw"]);
        assert!(expand("TQ28ne").is_err());
    }

    #[test]
    fn test_tiles_for_request() {
        assert_eq!(tiles_for_request("TQ28").unwrap().len(), 4);

        let single = tiles_for_request("TQ28NW").unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].to_string(), "TQ28nw");
    }

    #[test]
    fn test_fine_id_is_member_of_its_expanded_prefix() {
        for id in ["TQ28ne", "TQ28SE", "SU12sw", "NT27nw"] {
            let tile = TileId::parse(id).unwrap();
            let siblings = expand(&coarse_prefix(id).unwrap()).unwrap();
            assert!(siblings.contains(&tile), "{id} missing from its expansion");
        }
    }
}
