// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gzip pipelines.
//!
//! Compression favours speed over ratio. The download side runs as two
//! stages joined by a bounded channel: an async pump reading the object
//! stream, and a blocking gunzip-to-disk stage. Memory stays bounded by
//! `CHANNEL_DEPTH * CHUNK_SIZE` regardless of the dump size.

use dx_adapters::BlobReader;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

/// Bytes per pipeline chunk
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between pipeline stages
pub const CHANNEL_DEPTH: usize = 8;

/// Save progress callback, receiving a fraction in `[0, 1]`
pub type Progress = Arc<dyn Fn(f64) + Send + Sync>;

pub(crate) fn report(progress: Option<&Progress>, fraction: f64) {
    if let Some(progress) = progress {
        progress(fraction.clamp(0.0, 1.0));
    }
}

pub(crate) fn gzip_bytes(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::fast());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Counts bytes pulled through it and reports `read / total`
struct ProgressReader<'a, R> {
    inner: R,
    read: u64,
    total: u64,
    progress: Option<&'a Progress>,
}

impl<R: Read> Read for ProgressReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 && self.total > 0 {
            self.read += n as u64;
            report(self.progress, self.read as f64 / self.total as f64);
        }
        Ok(n)
    }
}

/// Compress `source` into a new file at `dest`. Returns the compressed size.
pub(crate) fn gzip_to_file<R: Read>(
    source: R,
    total: u64,
    dest: &Path,
    progress: Option<&Progress>,
) -> io::Result<u64> {
    let file = File::create(dest)?;
    let mut encoder = GzEncoder::new(BufWriter::with_capacity(CHUNK_SIZE, file), Compression::fast());
    let mut reader = ProgressReader { inner: source, read: 0, total, progress };
    io::copy(&mut reader, &mut encoder)?;
    let file = encoder.finish()?.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

/// Blocking reader over chunks sent by the async pump
struct ChannelReader {
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.chunk.len() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

async fn pump(mut reader: BlobReader, tx: mpsc::Sender<io::Result<Vec<u8>>>) {
    loop {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                chunk.truncate(n);
                // Receiver gone means the decoder already failed
                if tx.send(Ok(chunk)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }
}

/// Gunzip an object stream into a new file at `dest`. Returns the
/// decompressed size. The caller owns removing `dest` on failure.
pub(crate) async fn inflate_to_file(reader: BlobReader, dest: PathBuf) -> io::Result<u64> {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let pumping = tokio::spawn(pump(reader, tx));
    let written = tokio::task::spawn_blocking(move || {
        let mut decoder = MultiGzDecoder::new(ChannelReader { rx, chunk: Vec::new(), pos: 0 });
        let mut out = BufWriter::with_capacity(CHUNK_SIZE, File::create(&dest)?);
        let n = io::copy(&mut decoder, &mut out)?;
        out.flush()?;
        Ok::<_, io::Error>(n)
    })
    .await
    .map_err(io::Error::other)?;
    // The pump exits once the decoder side drops its receiver
    let _ = pumping.await;
    written
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
