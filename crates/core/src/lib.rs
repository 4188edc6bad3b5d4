//! Webcam face-presence monitoring for proctored exam attempts.
//!
//! A [`session::proctor_session::ProctorSession`] samples the camera on a
//! fixed cadence, runs face detection, and turns the results into a
//! presence status with a warning countdown. Prolonged absence raises a
//! violation that is handed to the embedder and reported to the exam
//! backend.

pub mod capture {
    pub mod domain {
        pub mod camera_error;
        pub mod capture_device;
        pub mod capture_manager;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detector_adapter;
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod presence {
    pub mod domain {
        pub mod presence_effect;
        pub mod presence_machine;
        pub mod presence_state;
    }
}

pub mod presentation {
    pub mod domain {
        pub mod overlay;
        pub mod status_text;
        pub mod status_view;
    }
    pub mod infrastructure;
}

pub mod reporting {
    pub mod domain {
        pub mod violation_reporter;
    }
    pub mod infrastructure;
}

pub mod session {
    pub mod detection_loop;
    pub mod presence_tick;
    pub mod proctor_session;
    pub mod violation_dispatcher;
}

pub mod shared {
    pub mod bounding_box;
    pub mod config;
    pub mod constants;
    pub mod frame;
}
