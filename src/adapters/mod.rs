//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                   |
//! |------------|--------------------|-------------------------------|
//! | `hardware` | MotionSensorPort   | PIR GPIO                      |
//! |            | ActuatorPort       | Servo/eye LEDC, audio UART    |
//! | `log_sink` | EventSink          | Serial log output             |
//! | `mqtt`     | StatusPublisher    | MQTT broker (commands, status)|
//! | `ota`      | UpdatePort         | HTTP image server, OTA slots  |
//! | `time`     | -                  | ESP32 system timer            |
//! | `wifi`     | -                  | ESP-IDF WiFi STA / soft-AP    |

pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod ota;
pub mod time;
pub mod wifi;
