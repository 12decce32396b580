//! Compressed, round-robin multiplexed sample output.
//!
//! Each logical stream (features, targets, winners) fans out over
//! `count` zstd-compressed files named `<base>_<i>`. Consecutive samples go
//! to consecutive files, and the three streams always sit on the same file
//! index so that sample `n` of every stream lands in the same shard.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use zstd::stream::write::Encoder;

use super::Sample;

/// One logical output stream spread over several compressed writers.
pub struct RoundRobinWriter<W: Write> {
    streams: Vec<Encoder<'static, W>>,
    index: usize,
}

impl RoundRobinWriter<BufWriter<File>> {
    /// Creates `count` files named `<base>_0` .. `<base>_{count-1}`.
    pub fn create(base: &Path, count: usize, level: i32) -> io::Result<Self> {
        let writers = shard_paths(base, count)
            .iter()
            .map(|path| File::create(path).map(BufWriter::new))
            .collect::<io::Result<Vec<_>>>()?;
        Self::from_writers(writers, level)
    }
}

impl<W: Write> RoundRobinWriter<W> {
    pub fn from_writers(writers: Vec<W>, level: i32) -> io::Result<Self> {
        if writers.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "round-robin writer needs at least one stream",
            ));
        }
        let streams = writers
            .into_iter()
            .map(|w| Encoder::new(w, level))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(RoundRobinWriter { streams, index: 0 })
    }

    /// Index of the stream the next write goes to.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.streams[self.index].write_all(data)
    }

    /// Moves on to the next stream, wrapping around.
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.streams.len();
    }

    /// Flushes the compressed frames and returns the underlying writers.
    pub fn finish(self) -> io::Result<Vec<W>> {
        self.streams
            .into_iter()
            .map(|encoder| {
                let mut inner = encoder.finish()?;
                inner.flush()?;
                Ok(inner)
            })
            .collect()
    }
}

/// Paths `<base>_0` .. `<base>_{count-1}`.
pub fn shard_paths(base: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| PathBuf::from(format!("{}_{}", base.display(), i)))
        .collect()
}

/// Features, targets, and winner labels advanced in lockstep.
pub struct SampleWriter<W: Write> {
    features: RoundRobinWriter<W>,
    targets: RoundRobinWriter<W>,
    winners: RoundRobinWriter<W>,
    written: usize,
}

/// Underlying writers of the three streams after `SampleWriter::finish`.
pub struct FinishedStreams<W> {
    pub features: Vec<W>,
    pub targets: Vec<W>,
    pub winners: Vec<W>,
}

impl SampleWriter<BufWriter<File>> {
    pub fn create(
        features_base: &Path,
        targets_base: &Path,
        winners_base: &Path,
        count: usize,
        level: i32,
    ) -> io::Result<Self> {
        Ok(SampleWriter::new(
            RoundRobinWriter::create(features_base, count, level)?,
            RoundRobinWriter::create(targets_base, count, level)?,
            RoundRobinWriter::create(winners_base, count, level)?,
        ))
    }
}

impl<W: Write> SampleWriter<W> {
    pub fn new(
        features: RoundRobinWriter<W>,
        targets: RoundRobinWriter<W>,
        winners: RoundRobinWriter<W>,
    ) -> Self {
        SampleWriter {
            features,
            targets,
            winners,
            written: 0,
        }
    }

    /// Writes one sample to all three streams, then advances all three.
    pub fn write_sample(&mut self, sample: &Sample) -> io::Result<()> {
        debug_assert!(
            self.features.index() == self.targets.index()
                && self.targets.index() == self.winners.index(),
            "output streams fell out of lockstep"
        );
        self.features.write(&sample.features)?;
        self.targets.write(&sample.target)?;
        self.winners.write(&sample.winner)?;
        self.features.advance();
        self.targets.advance();
        self.winners.advance();
        self.written += 1;
        Ok(())
    }

    pub fn samples_written(&self) -> usize {
        self.written
    }

    pub fn finish(self) -> io::Result<FinishedStreams<W>> {
        Ok(FinishedStreams {
            features: self.features.finish()?,
            targets: self.targets.finish()?,
            winners: self.winners.finish()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BOARD_AREA;

    fn in_memory(count: usize) -> RoundRobinWriter<Vec<u8>> {
        RoundRobinWriter::from_writers(vec![Vec::new(); count], 3).unwrap()
    }

    #[test]
    fn round_robin_cycles_through_streams() {
        let mut w = in_memory(3);
        for byte in 0u8..7 {
            assert_eq!(w.index(), byte as usize % 3);
            w.write(&[byte]).unwrap();
            w.advance();
        }
        let streams = w.finish().unwrap();
        let decoded: Vec<Vec<u8>> = streams
            .iter()
            .map(|s| zstd::decode_all(s.as_slice()).unwrap())
            .collect();
        assert_eq!(decoded, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
    }

    #[test]
    fn zero_streams_is_an_error() {
        assert!(RoundRobinWriter::<Vec<u8>>::from_writers(Vec::new(), 3).is_err());
    }

    #[test]
    fn sample_writer_keeps_streams_aligned() {
        let mut writer = SampleWriter::new(in_memory(2), in_memory(2), in_memory(2));
        for i in 0..5u8 {
            let sample = Sample {
                features: vec![i; 4],
                target: vec![i; BOARD_AREA],
                winner: [i, 0],
            };
            writer.write_sample(&sample).unwrap();
        }
        assert_eq!(writer.samples_written(), 5);

        let out = writer.finish().unwrap();
        let features = zstd::decode_all(out.features[0].as_slice()).unwrap();
        let targets = zstd::decode_all(out.targets[1].as_slice()).unwrap();
        let winners = zstd::decode_all(out.winners[0].as_slice()).unwrap();
        // Shard 0 holds samples 0, 2, 4; shard 1 holds 1, 3.
        assert_eq!(features, [[0u8; 4], [2; 4], [4; 4]].concat());
        assert_eq!(targets.len(), 2 * BOARD_AREA);
        assert!(targets[..BOARD_AREA].iter().all(|&b| b == 1));
        assert_eq!(winners, vec![0, 0, 2, 0, 4, 0]);
    }

    #[test]
    fn shard_names() {
        let paths = shard_paths(Path::new("out/features.z"), 2);
        assert_eq!(
            paths,
            vec![PathBuf::from("out/features.z_0"), PathBuf::from("out/features.z_1")]
        );
    }
}
