//! SGF (Smart Game Format) game record decoding and encoding.
//!
//! Only the main line of a 19x19 game is read: the root node supplies the
//! header (size, handicap, result, ranks, komi) and every following node
//! may carry one `B[..]` or `W[..]` move. Nested variations are followed
//! into their first branch; sibling branches are ignored.
//!
//! Records with handicap or setup stones are rejected because the board
//! engine only replays plain moves from an empty board.

use std::iter::Peekable;
use std::str::Chars;

use crate::board::{Move, Player, Point, BOARD_SIZE};

/// Komi used when a record has no `KM` property.
pub const DEFAULT_KOMI: f32 = 7.5;

/// Errors that can occur while reading an SGF record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SgfError {
    #[error("expected '(' to open the game tree")]
    MissingGameTree,

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unsupported board size: '{0}'")]
    UnsupportedBoardSize(String),

    #[error("handicap games are not supported: '{0}'")]
    Handicap(String),

    #[error("setup property {0} is not supported")]
    SetupStones(String),

    #[error("komi '{0}' is not a number")]
    InvalidKomi(String),

    #[error("komi {0} is outside the accepted range")]
    BizarreKomi(f32),

    #[error("invalid move coordinate: '{0}'")]
    InvalidCoordinate(String),
}

/// One property of a node, e.g. `AB[dd][pp]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub values: Vec<String>,
}

impl Property {
    fn first_value(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or("")
    }
}

/// A decoded game record.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub moves: Vec<Move>,
    /// Raw `RE` value, e.g. "B+R" or "W+3.5".
    pub result: String,
    pub winner: Option<Player>,
    pub black_rank: Option<i32>,
    pub white_rank: Option<i32>,
    pub komi: f32,
}

impl Default for GameRecord {
    fn default() -> Self {
        GameRecord {
            moves: Vec::new(),
            result: String::new(),
            winner: None,
            black_rank: None,
            white_rank: None,
            komi: DEFAULT_KOMI,
        }
    }
}

impl GameRecord {
    /// Rank of `player`, if the record states one we recognize.
    pub fn rank_of(&self, player: Player) -> Option<i32> {
        match player {
            Player::Black => self.black_rank,
            Player::White => self.white_rank,
        }
    }
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

/// Reads one bracketed value; the opening '[' has already been consumed.
fn parse_value(chars: &mut Peekable<Chars<'_>>) -> Result<String, SgfError> {
    let mut value = String::new();
    loop {
        match chars.next() {
            None => return Err(SgfError::UnexpectedEof),
            Some(']') => return Ok(value),
            Some('\\') => value.push(chars.next().ok_or(SgfError::UnexpectedEof)?),
            Some(c) => value.push(c),
        }
    }
}

/// Reads the properties of one node; the leading ';' has already been consumed.
fn parse_node(chars: &mut Peekable<Chars<'_>>) -> Result<Vec<Property>, SgfError> {
    let mut node = Vec::new();
    loop {
        skip_whitespace(chars);
        match chars.peek() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => return Ok(node),
        }

        let mut name = String::new();
        while let Some(c) = chars.next_if(char::is_ascii_alphabetic) {
            name.push(c);
        }

        let mut values = Vec::new();
        loop {
            skip_whitespace(chars);
            if chars.next_if_eq(&'[').is_none() {
                break;
            }
            values.push(parse_value(chars)?);
        }
        if values.is_empty() {
            return match chars.peek() {
                Some(&c) => Err(SgfError::UnexpectedChar(c)),
                None => Err(SgfError::UnexpectedEof),
            };
        }
        node.push(Property { name, values });
    }
}

/// Splits SGF text into the nodes of its main line.
pub fn parse_main_line(text: &str) -> Result<Vec<Vec<Property>>, SgfError> {
    let mut chars = text.chars().peekable();
    skip_whitespace(&mut chars);
    if chars.next() != Some('(') {
        return Err(SgfError::MissingGameTree);
    }

    let mut nodes = Vec::new();
    loop {
        skip_whitespace(&mut chars);
        match chars.next() {
            Some(';') => nodes.push(parse_node(&mut chars)?),
            // Step into the first variation and keep reading the main line.
            Some('(') => {}
            Some(')') => return Ok(nodes),
            Some(c) => return Err(SgfError::UnexpectedChar(c)),
            None => return Err(SgfError::UnexpectedEof),
        }
    }
}

/// Parses a move value. Empty and "tt" are passes.
pub fn parse_point(value: &str) -> Result<Option<Point>, SgfError> {
    if value.is_empty() {
        return Ok(None);
    }
    let invalid = || SgfError::InvalidCoordinate(value.to_string());
    let bytes = value.as_bytes();
    if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_lowercase) {
        return Err(invalid());
    }
    let x = (bytes[0] - b'a') as i32;
    let y = (bytes[1] - b'a') as i32;
    if x == BOARD_SIZE as i32 && y == BOARD_SIZE as i32 {
        return Ok(None);
    }
    Point::new(x, y).map(Some).map_err(|_| invalid())
}

/// Maps a rank string to a strength value: 1d..9d -> 1..9, 1p..3p -> 9,
/// 4p..9p -> 10..15. Fox-style "N段" and "PN段" are read the same way.
/// Kyu and unknown ranks return None.
pub fn parse_rank(s: &str) -> Option<i32> {
    let s = s.trim();
    let (pro, digits) = if let Some(rest) = s.strip_suffix('段') {
        match rest.strip_prefix('P') {
            Some(d) => (true, d),
            None => (false, rest),
        }
    } else if let Some(d) = s.strip_suffix('d') {
        (false, d)
    } else if let Some(d) = s.strip_suffix('p') {
        (true, d)
    } else {
        return None;
    };

    let n: i32 = digits.parse().ok()?;
    if !(1..=9).contains(&n) {
        return None;
    }
    Some(if pro { (n + 6).max(9) } else { n })
}

/// Inverse of `parse_rank` for encoding, preferring the dan/pro letters.
fn rank_string(rank: i32) -> Option<String> {
    match rank {
        1..=9 => Some(format!("{}d", rank)),
        10..=15 => Some(format!("{}p", rank - 6)),
        _ => None,
    }
}

/// Winner implied by an `RE` value.
pub fn parse_winner(result: &str) -> Option<Player> {
    if result.starts_with("B+") {
        Some(Player::Black)
    } else if result.starts_with("W+") {
        Some(Player::White)
    } else {
        None
    }
}

fn apply_header(record: &mut GameRecord, prop: &Property) -> Result<(), SgfError> {
    let value = prop.first_value();
    match prop.name.as_str() {
        "SZ" if value.trim() != "19" => {
            return Err(SgfError::UnsupportedBoardSize(value.to_string()));
        }
        "HA" if value.trim() != "0" => return Err(SgfError::Handicap(value.to_string())),
        "AB" | "AW" | "AE" => return Err(SgfError::SetupStones(prop.name.clone())),
        "RE" => {
            record.result = value.to_string();
            record.winner = parse_winner(value);
        }
        "BR" => record.black_rank = parse_rank(value),
        "WR" => record.white_rank = parse_rank(value),
        "KM" => {
            let komi = value
                .trim()
                .parse::<f32>()
                .map_err(|_| SgfError::InvalidKomi(value.to_string()))?;
            if komi.is_nan() || komi >= 8.5 || komi <= -0.5 {
                return Err(SgfError::BizarreKomi(komi));
            }
            record.komi = komi;
        }
        _ => {}
    }
    Ok(())
}

fn parse_move(node: &[Property]) -> Result<Option<Move>, SgfError> {
    let mut mv = None;
    for prop in node {
        match prop.name.as_str() {
            "B" | "W" => {
                let player = if prop.name == "B" {
                    Player::Black
                } else {
                    Player::White
                };
                mv = Some(Move {
                    player,
                    point: parse_point(prop.first_value())?,
                });
            }
            "AB" | "AW" | "AE" => return Err(SgfError::SetupStones(prop.name.clone())),
            "HA" => return Err(SgfError::Handicap(prop.first_value().to_string())),
            _ => {}
        }
    }
    Ok(mv)
}

/// Parses SGF text into a `GameRecord`.
pub fn parse_sgf(text: &str) -> Result<GameRecord, SgfError> {
    let nodes = parse_main_line(text)?;
    let mut record = GameRecord::default();

    let mut nodes = nodes.iter();
    if let Some(root) = nodes.next() {
        for prop in root {
            apply_header(&mut record, prop)?;
        }
    }
    for node in nodes {
        if let Some(mv) = parse_move(node)? {
            record.moves.push(mv);
        }
    }
    Ok(record)
}

fn encode_point(point: Option<Point>) -> String {
    match point {
        None => String::new(),
        Some(p) => {
            let x = (b'a' + p.x() as u8) as char;
            let y = (b'a' + p.y() as u8) as char;
            format!("{}{}", x, y)
        }
    }
}

fn escape_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == ']' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Encodes a record as a single-line SGF main line.
pub fn encode_sgf(record: &GameRecord) -> String {
    let mut out = String::with_capacity(16 + record.moves.len() * 6);
    out.push_str("(;GM[1]FF[4]SZ[19]");
    out.push_str(&format!("KM[{}]", record.komi));
    if !record.result.is_empty() {
        out.push_str(&format!("RE[{}]", escape_value(&record.result)));
    }
    if let Some(r) = record.black_rank.and_then(rank_string) {
        out.push_str(&format!("BR[{}]", r));
    }
    if let Some(r) = record.white_rank.and_then(rank_string) {
        out.push_str(&format!("WR[{}]", r));
    }
    for mv in &record.moves {
        out.push_str(&format!(";{}[{}]", mv.player.sgf_char(), encode_point(mv.point)));
    }
    out.push(')');
    out
}
