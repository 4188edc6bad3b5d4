use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::capture::domain::camera_error::CameraError;
use crate::capture::domain::capture_device::{CameraStream, CaptureConstraints, CaptureDevice};
use crate::shared::frame::Frame;

/// How long `read_frame` waits for the device to deliver its first frame.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `stop` waits for a grabber blocked in a device read.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Platform capture device opened through ffmpeg's device layer.
///
/// A grabber thread decodes continuously and keeps only the newest frame,
/// so a slow detection cadence always sees what the camera shows now
/// rather than a stale buffered frame.
pub struct FfmpegCamera {
    device: String,
    input_format: String,
}

impl FfmpegCamera {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            input_format: default_input_format().to_string(),
        }
    }

    pub fn with_input_format(mut self, input_format: impl Into<String>) -> Self {
        self.input_format = input_format.into();
        self
    }
}

impl Default for FfmpegCamera {
    fn default() -> Self {
        Self::new(default_device())
    }
}

/// ffmpeg input format for the platform's camera API.
pub fn default_input_format() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "avfoundation"
    }
    #[cfg(target_os = "windows")]
    {
        "dshow"
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        "v4l2"
    }
}

/// First camera on the platform, in the syntax of [`default_input_format`].
pub fn default_device() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "0"
    }
    #[cfg(target_os = "windows")]
    {
        "video=Integrated Camera"
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        "/dev/video0"
    }
}

impl CaptureDevice for FfmpegCamera {
    fn acquire(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        probe_device_node(&self.device)?;

        ffmpeg_next::init().map_err(classify)?;
        ffmpeg_next::device::register_all();

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == self.input_format)
            .ok_or_else(|| {
                CameraError::Other(format!(
                    "capture backend '{}' is not available in this ffmpeg build",
                    self.input_format
                ))
            })?;

        let mut options = ffmpeg_next::Dictionary::new();
        options.set(
            "video_size",
            &format!("{}x{}", constraints.ideal_width, constraints.ideal_height),
        );

        let ictx = ffmpeg_next::format::open_with(
            &self.device,
            &ffmpeg_next::format::Format::Input(format),
            options,
        )
        .map_err(classify)?
        .input();

        let decoder = DeviceDecoder::new(ictx)?;
        log::info!(
            "Opened {} device {} at {}x{}",
            self.input_format,
            self.device,
            decoder.width,
            decoder.height
        );
        Ok(Box::new(FfmpegCameraStream::start(decoder)))
    }
}

/// Classifies device nodes that exist on the filesystem (e.g. `/dev/video0`)
/// before ffmpeg gets to see them, so a missing or unreadable node is
/// reported precisely. Device names that are not paths are left to ffmpeg.
fn probe_device_node(device: &str) -> Result<(), CameraError> {
    let path = Path::new(device);
    if !path.is_absolute() {
        return Ok(());
    }
    std::fs::metadata(path)?;
    std::fs::File::open(path)?;
    Ok(())
}

fn classify(e: ffmpeg_next::Error) -> CameraError {
    match e {
        ffmpeg_next::Error::Other { errno } => {
            CameraError::from(std::io::Error::from_raw_os_error(errno))
        }
        other => CameraError::Other(other.to_string()),
    }
}

struct DeviceDecoder {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    sequence: u64,
}

// Safety: the decoder is moved into the grabber thread once and only ever
// touched from there. The raw pointers inside ffmpeg types are not shared.
unsafe impl Send for DeviceDecoder {}

impl DeviceDecoder {
    fn new(ictx: ffmpeg_next::format::context::Input) -> Result<Self, CameraError> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CameraError::Other("device has no video stream".to_string()))?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(classify)?;
        let decoder = codec_ctx.decoder().video().map_err(classify)?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(classify)?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            sequence: 0,
        })
    }

    /// Decodes until one full frame is available.
    fn next_frame(&mut self) -> Result<Frame, CameraError> {
        loop {
            if let Some(frame) = self.try_receive()? {
                return Ok(frame);
            }
            let Some((stream, packet)) = self.ictx.packets().next() else {
                return Err(CameraError::Other("camera feed ended".to_string()));
            };
            if stream.index() != self.stream_index {
                continue;
            }
            // Corrupt packets happen on USB cameras; skip and keep reading.
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, CameraError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame).map_err(classify)?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.sequence);
        self.sequence += 1;
        Ok(Some(frame))
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// stripping per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

/// Newest frame published by the grabber thread.
struct LatestFrame {
    slot: Mutex<Option<Result<Frame, CameraError>>>,
    ready: Condvar,
}

impl LatestFrame {
    fn publish(&self, result: Result<Frame, CameraError>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        self.ready.notify_all();
    }

    fn wait(&self, timeout: Duration) -> Result<Frame, CameraError> {
        let guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |slot| slot.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(result) => result.clone(),
            None => Err(CameraError::Other(
                "camera did not deliver a frame in time".to_string(),
            )),
        }
    }
}

struct Grabber {
    handle: JoinHandle<()>,
    /// Disconnects when the grabber thread exits.
    finished: Receiver<()>,
}

pub struct FfmpegCameraStream {
    latest: Arc<LatestFrame>,
    stop_requested: Arc<AtomicBool>,
    grabber: Option<Grabber>,
    stop_timeout: Duration,
}

impl FfmpegCameraStream {
    fn start(mut decoder: DeviceDecoder) -> Self {
        Self::spawn(move || decoder.next_frame(), STOP_TIMEOUT)
    }

    fn spawn<F>(mut next_frame: F, stop_timeout: Duration) -> Self
    where
        F: FnMut() -> Result<Frame, CameraError> + Send + 'static,
    {
        let latest = Arc::new(LatestFrame {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        });
        let stop_requested = Arc::new(AtomicBool::new(false));
        let (finished_tx, finished) = crossbeam_channel::bounded::<()>(0);

        let latest_clone = latest.clone();
        let stop_clone = stop_requested.clone();
        let handle = thread::spawn(move || {
            let _finished = finished_tx;
            while !stop_clone.load(Ordering::Relaxed) {
                let result = next_frame();
                let failed = result.is_err();
                latest_clone.publish(result);
                if failed {
                    break;
                }
            }
            // next_frame (and with it the device handle) is dropped here
        });

        Self {
            latest,
            stop_requested,
            grabber: Some(Grabber { handle, finished }),
            stop_timeout,
        }
    }
}

impl CameraStream for FfmpegCameraStream {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        if !self.is_active() {
            return Err(CameraError::Other("camera stream is stopped".to_string()));
        }
        self.latest.wait(FIRST_FRAME_TIMEOUT)
    }

    /// Returns once the grabber has exited, or after the stop timeout if
    /// the device is stuck in a read. A stuck grabber is detached and
    /// releases the device when the read returns.
    fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::Relaxed);
        let Some(Grabber { handle, finished }) = self.grabber.take() else {
            return;
        };
        match finished.recv_timeout(self.stop_timeout) {
            Err(RecvTimeoutError::Timeout) => log::warn!(
                "Camera did not stop within {:?}; detaching grabber thread",
                self.stop_timeout
            ),
            _ => {
                if handle.join().is_err() {
                    log::warn!("Camera grabber thread panicked");
                }
            }
        }
    }

    fn is_active(&self) -> bool {
        self.grabber.is_some()
    }
}

impl Drop for FfmpegCameraStream {
    fn drop(&mut self) {
        self.stop();
    }
}
