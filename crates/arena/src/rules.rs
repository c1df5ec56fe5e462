//! Chess rules on top of `cozy-chess`.
//!
//! [`Game`] tracks a position together with the moves that produced it. Moves
//! go in and come out in UCI long algebraic notation with standard castling
//! (`e1g1`), while `cozy-chess` internally encodes castling as the king
//! capturing its own rook (`e1h1`).

use arena_openings::Opening;
use cozy_chess::{Board, Color, File, Move, Piece, Square};
use thiserror::Error;

/// Errors from position setup and move application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    #[error("Malformed move: {0}")]
    InvalidMove(String),
    #[error("Illegal move {mv} in position {fen}")]
    IllegalMove { mv: String, fen: String },
}

/// Why a game is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// The side to move is mated.
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    /// Fifty moves without a capture or pawn move.
    FiftyMoves,
    ThreefoldRepetition,
}

impl Terminal {
    /// Whether the game ended without a winner.
    pub fn is_draw(self) -> bool {
        !matches!(self, Terminal::Checkmate)
    }
}

/// A game in progress: start position, current board, and the moves between.
#[derive(Debug, Clone)]
pub struct Game {
    start: Board,
    start_fen: Option<String>,
    board: Board,
    moves: Vec<String>,
    history: Vec<u64>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// The standard starting position.
    pub fn new() -> Self {
        Self::from_board(Board::default(), None)
    }

    /// A game starting from an arbitrary position.
    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let board =
            Board::from_fen(fen, false).map_err(|_| RulesError::InvalidFen(fen.to_string()))?;
        Ok(Self::from_board(board, Some(fen.to_string())))
    }

    /// The standard starting position with `moves` already played.
    pub fn from_moves<S: AsRef<str>>(moves: &[S]) -> Result<Self, RulesError> {
        let mut game = Self::new();
        for mv in moves {
            game.play_uci(mv.as_ref())?;
        }
        Ok(game)
    }

    /// The position an opening line leads to.
    pub fn from_opening(opening: &Opening) -> Result<Self, RulesError> {
        Self::from_moves(&opening.moves)
    }

    fn from_board(board: Board, start_fen: Option<String>) -> Self {
        let history = vec![board.hash()];
        Self {
            start: board.clone(),
            start_fen,
            board,
            moves: Vec::new(),
            history,
        }
    }

    /// FEN of the start position, `None` for the standard one.
    pub fn start_fen(&self) -> Option<&str> {
        self.start_fen.as_deref()
    }

    /// Every move since the start position, in UCI notation.
    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn ply(&self) -> usize {
        self.moves.len()
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Legal moves in the current position, in UCI notation.
    pub fn legal_moves(&self) -> Vec<String> {
        legal_moves(&self.board)
            .into_iter()
            .map(|mv| to_standard_uci(&self.board, mv))
            .collect()
    }

    pub fn is_legal(&self, uci: &str) -> bool {
        self.resolve(uci).is_ok()
    }

    /// Apply a move given in UCI notation.
    pub fn play_uci(&mut self, uci: &str) -> Result<(), RulesError> {
        let mv = self.resolve(uci)?;
        let standard = to_standard_uci(&self.board, mv);
        self.board.play(mv);
        self.moves.push(standard);
        self.history.push(self.board.hash());
        Ok(())
    }

    /// SAN for a legal move in the current position.
    pub fn san(&self, uci: &str) -> Result<String, RulesError> {
        let mv = self.resolve(uci)?;
        Ok(san_for_move(&self.board, mv))
    }

    /// SAN for every move played so far, replayed from the start position.
    pub fn san_history(&self) -> Vec<String> {
        let mut board = self.start.clone();
        let mut sans = Vec::with_capacity(self.moves.len());
        for uci in &self.moves {
            // Moves were validated when played.
            let Ok(mv) = resolve_move(&board, uci) else {
                break;
            };
            sans.push(san_for_move(&board, mv));
            board.play(mv);
        }
        sans
    }

    /// Checkmate and stalemate first, then the automatic and claimable draws.
    pub fn terminal(&self) -> Option<Terminal> {
        if legal_moves(&self.board).is_empty() {
            return Some(if self.board.checkers().is_empty() {
                Terminal::Stalemate
            } else {
                Terminal::Checkmate
            });
        }
        if insufficient_material(&self.board) {
            return Some(Terminal::InsufficientMaterial);
        }
        if self.board.halfmove_clock() >= 100 {
            return Some(Terminal::FiftyMoves);
        }
        let current = self.board.hash();
        if self.history.iter().filter(|&&h| h == current).count() >= 3 {
            return Some(Terminal::ThreefoldRepetition);
        }
        None
    }

    fn resolve(&self, uci: &str) -> Result<Move, RulesError> {
        resolve_move(&self.board, uci)
    }
}

fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|list| {
        moves.extend(list);
        false
    });
    moves
}

/// Parse a UCI move and find it among the legal moves, accepting both castling encodings.
fn resolve_move(board: &Board, uci: &str) -> Result<Move, RulesError> {
    let parsed: Move = uci
        .trim()
        .parse()
        .map_err(|_| RulesError::InvalidMove(uci.to_string()))?;
    let candidate = from_standard_castling(board, parsed);
    let legal = legal_moves(board);
    [candidate, parsed]
        .into_iter()
        .find(|mv| legal.contains(mv))
        .ok_or_else(|| RulesError::IllegalMove {
            mv: uci.to_string(),
            fen: board.to_string(),
        })
}

fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// `e1g1` -> `e1h1` when it is a castling king move.
fn from_standard_castling(board: &Board, mv: Move) -> Move {
    if board.piece_on(mv.from) != Some(Piece::King) || mv.from.file() != File::E {
        return mv;
    }
    let rook_file = match mv.to.file() {
        File::G => File::H,
        File::C => File::A,
        _ => return mv,
    };
    if mv.from.rank() != mv.to.rank() {
        return mv;
    }
    Move {
        from: mv.from,
        to: Square::new(rook_file, mv.to.rank()),
        promotion: None,
    }
}

/// `e1h1` -> `e1g1` for castling moves, unchanged otherwise.
fn to_standard_uci(board: &Board, mv: Move) -> String {
    if is_castling(board, mv) {
        let file = if mv.to.file() as usize > mv.from.file() as usize {
            File::G
        } else {
            File::C
        };
        let to = Square::new(file, mv.from.rank());
        return format!("{}{}", mv.from, to);
    }
    mv.to_string()
}

fn insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }
    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    if knights.len() + bishops.len() <= 1 {
        return true;
    }
    // Only bishops left, all on one square colour.
    if knights.is_empty() {
        let mut shades = bishops.into_iter().map(square_shade);
        if let Some(first) = shades.next() {
            return shades.all(|shade| shade == first);
        }
    }
    false
}

fn square_shade(sq: Square) -> usize {
    (sq.file() as usize + sq.rank() as usize) % 2
}

fn piece_letter(piece: Piece) -> Option<char> {
    match piece {
        Piece::Pawn => None,
        Piece::Knight => Some('N'),
        Piece::Bishop => Some('B'),
        Piece::Rook => Some('R'),
        Piece::Queen => Some('Q'),
        Piece::King => Some('K'),
    }
}

fn square_chars(sq: Square) -> (char, char) {
    let name = sq.to_string();
    let mut chars = name.chars();
    let file = chars.next().unwrap_or('?');
    let rank = chars.next().unwrap_or('?');
    (file, rank)
}

fn san_for_move(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return mv.to_string();
    };

    let mut san = String::new();
    if is_castling(board, mv) {
        san.push_str(if mv.to.file() as usize > mv.from.file() as usize {
            "O-O"
        } else {
            "O-O-O"
        });
    } else {
        let (from_file, from_rank) = square_chars(mv.from);
        let capture = board.color_on(mv.to) == Some(!board.side_to_move())
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        match piece_letter(piece) {
            Some(letter) => {
                san.push(letter);
                let rivals: Vec<Square> = legal_moves(board)
                    .into_iter()
                    .filter(|m| {
                        m.to == mv.to && m.from != mv.from && board.piece_on(m.from) == Some(piece)
                    })
                    .map(|m| m.from)
                    .collect();
                if !rivals.is_empty() {
                    let shares_file = rivals.iter().any(|sq| sq.file() == mv.from.file());
                    let shares_rank = rivals.iter().any(|sq| sq.rank() == mv.from.rank());
                    if !shares_file {
                        san.push(from_file);
                    } else if !shares_rank {
                        san.push(from_rank);
                    } else {
                        san.push(from_file);
                        san.push(from_rank);
                    }
                }
            }
            None if capture => san.push(from_file),
            None => {}
        }

        if capture {
            san.push('x');
        }
        san.push_str(&mv.to.to_string());
        if let Some(letter) = mv.promotion.and_then(piece_letter) {
            san.push('=');
            san.push(letter);
        }
    }

    let mut next = board.clone();
    next.play(mv);
    if !next.checkers().is_empty() {
        san.push(if legal_moves(&next).is_empty() { '#' } else { '+' });
    }
    san
}
