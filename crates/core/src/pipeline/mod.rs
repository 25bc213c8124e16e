pub mod pipeline_logger;
pub mod scan_face_use_case;
pub mod session;
pub mod watch_faces_use_case;
