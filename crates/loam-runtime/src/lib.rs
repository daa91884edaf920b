//! Chunk generation workers and the live-chunk streamer.
#![forbid(unsafe_code)]

mod noise_pool;
pub mod provider;
pub mod streamer;

pub use provider::{ChunkProvider, GenOut, LocalProvider, WorkerProvider};
pub use streamer::{
    ChunkSink, LiveChunk, LiveChunks, NullSink, StreamConfig, StreamStats, WorldStreamer,
};
