//! Local video file source using FFmpeg.
//!
//! Frames are decoded in-memory and converted to packed RGB24. The decoder is
//! flushed at end of file so trailing buffered frames are still delivered.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;

use super::{FrameSource, SourceStats};
use crate::frame::{frame_from_rgb, Frame};

pub(crate) struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    eof_sent: bool,
    last_error: Option<String>,
}

impl FfmpegFileSource {
    pub(crate) fn new(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open file input '{}' with ffmpeg", path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!(
            "FileSource: {} opened ({}x{}, ffmpeg)",
            path,
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            eof_sent: false,
            last_error: None,
        })
    }

    fn receive(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let frame = frame_to_rgb(&rgb_frame)?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = self.receive()? {
            return Ok(Some(frame));
        }
        if self.eof_sent {
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.input.packets().next() else {
                break;
            };
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .context("send packet to ffmpeg decoder")?;
            if let Some(frame) = self.receive()? {
                return Ok(Some(frame));
            }
        }

        self.decoder
            .send_eof()
            .context("flush ffmpeg decoder")?;
        self.eof_sent = true;
        self.receive()
    }
}

impl FrameSource for FfmpegFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.read().inspect_err(|e| {
            self.last_error = Some(format!("{:#}", e));
        })
    }

    fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            locator: self.path.clone(),
        }
    }
}

fn frame_to_rgb(frame: &ffmpeg::frame::Video) -> Result<Frame> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let len = row_bytes * height as usize;
        let pixels = data
            .get(..len)
            .context("ffmpeg frame is shorter than its dimensions")?
            .to_vec();
        return frame_from_rgb(pixels, width, height);
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    frame_from_rgb(pixels, width, height)
}
