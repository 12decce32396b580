//! Training sample generation from SGF game records.
//!
//! Each record is replayed through a fresh `BoardState` and
//! `FeatureExtractor`. Every sampled move yields the feature tensor of the
//! position before the move, a one-hot target of the played point, and a
//! two-byte winner label from the mover's point of view. Records are
//! converted in parallel batches on a rayon pool and written in corpus order.

pub mod corpus;
pub mod writer;

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::{BoardError, BoardState, Move, Player, Point, BOARD_AREA, BOARD_SIZE};
use crate::nn::encoding::{plane_names, FeatureExtractor, PLANE_COUNT, TENSOR_LEN};
use crate::protocol::{parse_sgf, GameRecord, SgfError};

pub use corpus::{scan_directory, select_range, shuffle_paths};
pub use writer::{shard_paths, FinishedStreams, RoundRobinWriter, SampleWriter};

/// Bytes per winner label.
pub const WINNER_LEN: usize = 2;

/// Settings for a corpus conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// First record (after shuffling) to convert.
    pub start: usize,
    /// One past the last record to convert. `None` means the whole corpus.
    pub stop: Option<usize>,
    /// Number of shards per output stream.
    pub round_robin_count: usize,
    pub threads: usize,
    /// Seeds the corpus shuffle and, offset by record index, per-game sampling.
    pub seed: u64,
    /// Sample this many random moves per game instead of every move.
    pub moves_per_game: Option<usize>,
    /// Moves by players ranked below this are not sampled.
    pub min_rank: Option<i32>,
    /// Skip records without a decisive result.
    pub require_winner: bool,
    /// zstd compression level for the output streams.
    pub compression_level: i32,
    /// Records converted per parallel batch.
    pub batch_size: usize,
    /// Log progress every this many records.
    pub progress_interval: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            start: 0,
            stop: None,
            round_robin_count: 1,
            threads: 4,
            seed: 12345,
            moves_per_game: None,
            min_rank: None,
            require_winner: true,
            compression_level: 3,
            batch_size: 256,
            progress_interval: 10_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads a `ConvertConfig` from a JSON file. Missing fields take defaults.
pub fn load_config(path: &Path) -> Result<ConvertConfig, ConfigError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Why a record produced no samples.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to read record: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Sgf(#[from] SgfError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("no winner in result '{0}'")]
    NoWinner(String),
    #[error("both players are below the minimum rank")]
    RankTooLow,
}

/// One training example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// `PLANE_COUNT * BOARD_AREA` bytes.
    pub features: Vec<u8>,
    /// One-hot grid of the played point.
    pub target: Vec<u8>,
    /// `[mover won, opponent won]`.
    pub winner: [u8; WINNER_LEN],
}

/// One-hot `BOARD_AREA` grid with `point` set.
pub fn one_hot_target(point: Point) -> Vec<u8> {
    let mut target = vec![0u8; BOARD_AREA];
    target[point.index()] = 1;
    target
}

/// Winner label from `mover`'s point of view. All zero when unknown.
pub fn winner_label(winner: Option<Player>, mover: Player) -> [u8; WINNER_LEN] {
    match winner {
        Some(w) if w == mover => [1, 0],
        Some(_) => [0, 1],
        None => [0, 0],
    }
}

fn meets_rank(rank: Option<i32>, min_rank: Option<i32>) -> bool {
    match min_rank {
        None => true,
        Some(threshold) => rank.is_some_and(|r| r >= threshold),
    }
}

/// Replays one game, pairing a board with its move history.
///
/// Features are always taken from the position before the move is placed.
#[derive(Debug, Clone, Default)]
pub struct GameEncoder {
    board: BoardState,
    extractor: FeatureExtractor,
    winner: Option<Player>,
}

impl GameEncoder {
    pub fn new(winner: Option<Player>) -> Self {
        GameEncoder {
            board: BoardState::new(),
            extractor: FeatureExtractor::new(),
            winner,
        }
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Applies `mv`. Returns a sample for the pre-move position when
    /// `sample` is set and the move is not a pass.
    pub fn apply(&mut self, mv: &Move, sample: bool) -> Result<Option<Sample>, BoardError> {
        let Some(point) = mv.point else {
            self.extractor.record_move(None);
            return Ok(None);
        };
        let sample = sample.then(|| Sample {
            features: self.extractor.extract(&self.board, mv.player),
            target: one_hot_target(point),
            winner: winner_label(self.winner, mv.player),
        });
        self.board.place_stone(mv.player, point)?;
        self.extractor.record_move(Some(point));
        Ok(sample)
    }
}

/// Indices of the moves to sample. `None` selects every move.
fn selected_moves(record: &GameRecord, config: &ConvertConfig, rng: &mut SmallRng) -> Option<HashSet<usize>> {
    let wanted = config.moves_per_game?;
    let playable: Vec<usize> = record
        .moves
        .iter()
        .enumerate()
        .filter(|(_, mv)| !mv.is_pass())
        .map(|(i, _)| i)
        .collect();
    let amount = wanted.min(playable.len());
    Some(
        rand::seq::index::sample(rng, playable.len(), amount)
            .into_iter()
            .map(|i| playable[i])
            .collect(),
    )
}

/// Converts a parsed record into its training samples.
pub fn game_samples(
    record: &GameRecord,
    config: &ConvertConfig,
    rng: &mut SmallRng,
) -> Result<Vec<Sample>, ConvertError> {
    if config.require_winner && record.winner.is_none() {
        return Err(ConvertError::NoWinner(record.result.clone()));
    }
    if !meets_rank(record.black_rank, config.min_rank) && !meets_rank(record.white_rank, config.min_rank) {
        return Err(ConvertError::RankTooLow);
    }

    let selected = selected_moves(record, config, rng);
    let mut encoder = GameEncoder::new(record.winner);
    let mut samples = Vec::new();
    for (i, mv) in record.moves.iter().enumerate() {
        let wanted = selected.as_ref().map_or(true, |s| s.contains(&i))
            && meets_rank(record.rank_of(mv.player), config.min_rank);
        if let Some(sample) = encoder.apply(mv, wanted)? {
            samples.push(sample);
        }
    }
    Ok(samples)
}

/// Reads, parses, and converts one SGF file.
pub fn convert_file(path: &Path, config: &ConvertConfig, rng: &mut SmallRng) -> Result<Vec<Sample>, ConvertError> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let record = parse_sgf(&text)?;
    game_samples(&record, config, rng)
}

/// Counters for a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub records_seen: usize,
    pub records_converted: usize,
    pub records_skipped: usize,
    pub samples_written: usize,
}

/// Converts `paths` in order, writing every sample to `writer`.
///
/// Records that fail to convert are logged and skipped. Output errors abort.
pub fn convert_paths<W: Write>(
    paths: &[PathBuf],
    config: &ConvertConfig,
    writer: &mut SampleWriter<W>,
) -> io::Result<ConversionStats> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads.max(1))
        .build()
        .map_err(io::Error::other)?;

    let mut stats = ConversionStats::default();
    let batch_size = config.batch_size.max(1);
    let progress = config.progress_interval.max(1);

    for (batch, chunk) in paths.chunks(batch_size).enumerate() {
        let offset = batch * batch_size;
        let results: Vec<Result<Vec<Sample>, ConvertError>> = pool.install(|| {
            chunk
                .par_iter()
                .enumerate()
                .map(|(i, path)| {
                    let mut rng = SmallRng::seed_from_u64(config.seed.wrapping_add((offset + i) as u64));
                    convert_file(path, config, &mut rng)
                })
                .collect()
        });

        for (path, result) in chunk.iter().zip(results) {
            stats.records_seen += 1;
            match result {
                Ok(samples) => {
                    for sample in &samples {
                        writer.write_sample(sample)?;
                    }
                    stats.records_converted += 1;
                    stats.samples_written += samples.len();
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping record");
                    stats.records_skipped += 1;
                }
            }
            if stats.records_seen % progress == 0 {
                info!(
                    records = stats.records_seen,
                    samples = stats.samples_written,
                    skipped = stats.records_skipped,
                    "progress"
                );
            }
        }
    }
    Ok(stats)
}

/// Scans `root`, shuffles, selects the configured range, and writes the
/// three sharded output streams.
pub fn run_conversion(
    root: &Path,
    features_base: &Path,
    targets_base: &Path,
    winners_base: &Path,
    config: &ConvertConfig,
) -> io::Result<ConversionStats> {
    let mut paths = scan_directory(root)?;
    info!(root = %root.display(), files = paths.len(), "scanned corpus");
    shuffle_paths(&mut paths, config.seed);
    let selected = select_range(&paths, config.start, config.stop);
    info!(
        start = config.start,
        count = selected.len(),
        shards = config.round_robin_count,
        "converting records"
    );

    let mut writer = SampleWriter::create(
        features_base,
        targets_base,
        winners_base,
        config.round_robin_count,
        config.compression_level,
    )?;
    let stats = convert_paths(selected, config, &mut writer)?;
    writer.finish()?;
    info!(
        records = stats.records_seen,
        converted = stats.records_converted,
        skipped = stats.records_skipped,
        samples = stats.samples_written,
        "conversion finished"
    );
    Ok(stats)
}

/// Describes the layout of a converted dataset.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub board_size: usize,
    pub plane_count: usize,
    pub planes: Vec<String>,
    pub feature_bytes: usize,
    pub target_bytes: usize,
    pub winner_bytes: usize,
    pub round_robin_count: usize,
    pub seed: u64,
    pub stats: ConversionStats,
}

impl Manifest {
    pub fn new(config: &ConvertConfig, stats: ConversionStats) -> Self {
        Manifest {
            board_size: BOARD_SIZE,
            plane_count: PLANE_COUNT,
            planes: plane_names(),
            feature_bytes: TENSOR_LEN,
            target_bytes: BOARD_AREA,
            winner_bytes: WINNER_LEN,
            round_robin_count: config.round_robin_count,
            seed: config.seed,
            stats,
        }
    }

    pub fn write_json<W: Write>(&self, out: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(out, self)
    }
}
