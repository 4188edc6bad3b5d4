use serde::{Deserialize, Serialize};

use crate::capture::domain::camera_error::CameraError;
use crate::presence::domain::presence_state::PresenceStatus;

/// Language of user-facing texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "id")]
    Indonesian,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::English),
            "id" | "indonesian" => Ok(Locale::Indonesian),
            other => Err(format!("unsupported locale '{other}', expected 'en' or 'id'")),
        }
    }
}

/// Visual severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Ok,
    Warning,
    Danger,
}

impl StatusTone {
    pub fn for_status(status: PresenceStatus) -> Self {
        match status {
            PresenceStatus::Present => StatusTone::Ok,
            PresenceStatus::Searching | PresenceStatus::Warning => StatusTone::Warning,
            PresenceStatus::Violated => StatusTone::Danger,
        }
    }
}

/// Whole seconds shown in a countdown. Partial seconds round up so the
/// display never reads 0 while time remains.
pub fn countdown_seconds(seconds_remaining: f64) -> u64 {
    seconds_remaining.max(0.0).ceil() as u64
}

pub fn status_message(locale: Locale, status: PresenceStatus, seconds_remaining: Option<f64>) -> String {
    match (locale, status) {
        (Locale::English, PresenceStatus::Present) => "Face detected".to_string(),
        (Locale::English, PresenceStatus::Searching) => "Searching for face...".to_string(),
        (Locale::English, PresenceStatus::Warning) => match seconds_remaining {
            Some(s) => format!("Face not detected ({}s)", countdown_seconds(s)),
            None => "Face not detected".to_string(),
        },
        (Locale::English, PresenceStatus::Violated) => "VIOLATION: Face not detected!".to_string(),
        (Locale::Indonesian, PresenceStatus::Present) => "Wajah Terdeteksi".to_string(),
        (Locale::Indonesian, PresenceStatus::Searching) => "Mencari wajah...".to_string(),
        (Locale::Indonesian, PresenceStatus::Warning) => match seconds_remaining {
            Some(s) => format!("Wajah Tidak Terdeteksi ({}s)", countdown_seconds(s)),
            None => "Wajah Tidak Terdeteksi".to_string(),
        },
        (Locale::Indonesian, PresenceStatus::Violated) => {
            "PELANGGARAN: Wajah Tidak Terdeteksi!".to_string()
        }
    }
}

/// Shown between a successful initialization and the first tick.
pub fn initializing_message(locale: Locale) -> &'static str {
    match locale {
        Locale::English => "Detecting face...",
        Locale::Indonesian => "Mendeteksi wajah...",
    }
}

pub fn error_title(locale: Locale) -> &'static str {
    match locale {
        Locale::English => "Camera error",
        Locale::Indonesian => "Kamera Error",
    }
}

pub fn camera_error_message(locale: Locale, error: &CameraError) -> String {
    match (locale, error) {
        (Locale::English, CameraError::PermissionDenied) => {
            "Camera access denied. Allow camera access to continue the exam.".to_string()
        }
        (Locale::English, CameraError::DeviceNotFound) => {
            "No camera found. Make sure this device has a webcam.".to_string()
        }
        (Locale::English, CameraError::Other(msg)) => format!("Failed to access camera: {msg}"),
        (Locale::Indonesian, CameraError::PermissionDenied) => {
            "Akses kamera ditolak. Izinkan akses kamera untuk melanjutkan ujian.".to_string()
        }
        (Locale::Indonesian, CameraError::DeviceNotFound) => {
            "Kamera tidak ditemukan. Pastikan perangkat memiliki webcam.".to_string()
        }
        (Locale::Indonesian, CameraError::Other(msg)) => format!("Gagal mengakses kamera: {msg}"),
    }
}

pub fn model_error_message(locale: Locale, detail: &str) -> String {
    match locale {
        Locale::English => format!("Face detection model could not be loaded: {detail}"),
        Locale::Indonesian => format!("Model deteksi wajah gagal dimuat: {detail}"),
    }
}

pub fn config_error_message(locale: Locale, detail: &str) -> String {
    match locale {
        Locale::English => format!("Invalid proctoring configuration: {detail}"),
        Locale::Indonesian => format!("Konfigurasi pengawasan tidak valid: {detail}"),
    }
}
