pub mod deadline_face_detector;
pub mod model_resolver;
pub mod onnx_yolo_detector;
