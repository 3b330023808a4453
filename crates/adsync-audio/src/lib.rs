pub mod capture;
pub mod device;
pub mod prerecorded;
pub mod wav;

pub use capture::MicrophoneSource;
pub use device::DeviceManager;
pub use prerecorded::PrerecordedSource;
pub use wav::encode_wav;
