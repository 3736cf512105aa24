pub mod onnx_hand_detector;
