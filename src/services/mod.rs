pub mod detector;
pub mod device_reader;
pub mod injector;
pub mod keycode_map;
pub mod signal_emitter;
pub mod supervisor;
pub mod virtual_device;

pub use detector::DoubleTapDetector;
pub use device_reader::DeviceReader;
pub use injector::InjectionService;
pub use signal_emitter::SignalEmitter;
pub use supervisor::Supervisor;
pub use virtual_device::VirtualDevice;
