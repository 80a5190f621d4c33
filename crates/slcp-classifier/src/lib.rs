//! Chip- and board-specific identifier classification.
//!
//! SLC base projects reference the part they were created for as ordinary
//! components. To retarget a project those components have to be recognized
//! and stripped. The grammar is deliberately small:
//!
//! ```text
//! chip  := (letters digits){2,5} letters?      e.g. MGM210PB32JIA, EFR32FG14P231F256GM32
//! board := "brd" digits letter ("_" any+)?     e.g. BRD4180A, brd4001a_vcom
//! ```
//!
//! Matching is case-insensitive and anchored at both ends.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Chip part numbers: 2 to 5 letter+digit groups with optional trailing letters.
const CHIP_PATTERN: &str = r"(?:[a-z]+[0-9]+){2,5}[a-z]*";

/// Board identifiers and board-specific config components.
const BOARD_PATTERN: &str = r"brd[0-9]+[a-z](?:_.+)?";

/// What an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// A chip or module part number.
    Chip,
    /// A board or a board-specific configuration component.
    Board,
    /// Anything else: a regular, chip-agnostic component.
    Generic,
}

impl IdentifierKind {
    /// Whether this identifier ties a project to a particular device.
    pub fn is_device_specific(self) -> bool {
        !matches!(self, IdentifierKind::Generic)
    }
}

fn chip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("(?i)^{CHIP_PATTERN}$")).expect("chip grammar is a valid regex")
    })
}

fn board_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("(?is)^{BOARD_PATTERN}$")).expect("board grammar is a valid regex")
    })
}

/// Classify a component identifier.
///
/// Chip shape is checked first; no identifier can match both since board
/// identifiers have a single digit group.
pub fn classify(id: &str) -> IdentifierKind {
    if chip_regex().is_match(id) {
        IdentifierKind::Chip
    } else if board_regex().is_match(id) {
        IdentifierKind::Board
    } else {
        IdentifierKind::Generic
    }
}

/// Shorthand for `classify(id).is_device_specific()`.
pub fn is_device_specific(id: &str) -> bool {
    classify(id).is_device_specific()
}
