pub mod domain;
pub mod infrastructure;
pub mod locate_once_use_case;
pub mod pipeline_executor;
pub mod pipeline_logger;
pub mod track_faces_use_case;
