//! Frame-by-frame decoding via ffmpeg
//!
//! Spawns `ffmpeg -f rawvideo -pix_fmt rgb24 pipe:1` and reads fixed-size
//! RGB24 frames off the pipe. One frame at a time, blocking on the
//! subprocess.

use crate::errors::{Result, TrackerError};
use crate::video::probe::VideoInfo;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

/// A single decoded frame, RGB24, row-major
#[derive(Debug, Clone)]
pub struct Frame {
    /// 1-based frame number
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Bytes per RGB24 frame at the given dimensions
    pub fn size_bytes(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }
}

/// Streaming reader over a spawned ffmpeg decode process
#[derive(Debug)]
pub struct FrameReader {
    child: Child,
    stdout: ChildStdout,
    stderr_task: Option<JoinHandle<String>>,
    frame_size: usize,
    width: u32,
    height: u32,
    next_index: u64,
    finished: bool,
}

impl FrameReader {
    /// Spawn the decode process for a probed video
    pub fn open(path: &Path, info: &VideoInfo) -> Result<Self> {
        if info.width == 0 || info.height == 0 {
            return Err(TrackerError::DecodeFailed {
                status: 0,
                stderr: "Video has zero dimensions".to_string(),
            });
        }

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TrackerError::ToolMissing("ffmpeg".to_string()),
                _ => TrackerError::Io(e),
            })?;

        let stdout = child.stdout.take().expect("stdout was piped");

        // Drain stderr concurrently so the child can't block on a full pipe
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text).await;
                text
            })
        });

        Ok(FrameReader {
            child,
            stdout,
            stderr_task,
            frame_size: Frame::size_bytes(info.width, info.height),
            width: info.width,
            height: info.height,
            next_index: 1,
            finished: false,
        })
    }

    /// Read the next frame. `Ok(None)` on clean end of stream; EOF inside
    /// a frame or a non-zero ffmpeg exit is an error.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; self.frame_size];
        let mut filled = 0;

        while filled < self.frame_size {
            let n = self.stdout.read(&mut data[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            // Clean EOF between frames
            self.finished = true;
            self.wait_for_exit().await?;
            return Ok(None);
        }

        if filled < self.frame_size {
            self.finished = true;
            return Err(TrackerError::TruncatedFrame {
                index: self.next_index,
                got: filled,
                want: self.frame_size,
            });
        }

        let frame = Frame {
            index: self.next_index,
            width: self.width,
            height: self.height,
            data,
        };
        self.next_index += 1;

        Ok(Some(frame))
    }

    /// Frames handed out so far
    pub fn frames_read(&self) -> u64 {
        self.next_index - 1
    }

    async fn wait_for_exit(&mut self) -> Result<()> {
        let stderr_text = match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        let status = self.child.wait().await?;
        if !status.success() {
            return Err(TrackerError::DecodeFailed {
                status: status.code().unwrap_or(-1),
                stderr: stderr_text.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size() {
        assert_eq!(Frame::size_bytes(1280, 720), 1280 * 720 * 3);
        assert_eq!(Frame::size_bytes(1, 1), 3);
    }

    #[test]
    fn test_open_rejects_zero_dimensions() {
        let info = VideoInfo {
            width: 0,
            height: 720,
            fps: 30.0,
            frame_count: None,
            duration_seconds: None,
        };

        let err = FrameReader::open(Path::new("clip.mp4"), &info).unwrap_err();
        assert!(err.to_string().contains("zero dimensions"));
    }

    // Note: decoding a real file requires ffmpeg on PATH and is covered
    // by integration use, not unit tests.
}
