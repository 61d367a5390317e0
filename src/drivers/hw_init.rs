//! One-shot hardware peripheral initialization.
//!
//! Configures the PIR input, LEDC timers/channels for the servo and the
//! eye LEDs, and the audio UART using raw ESP-IDF sys calls.  Called once
//! from `main()` before the control loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::config::EyeWiring;
use crate::error::ActuatorError;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    UartInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::UartInitFailed(rc) => write!(f, "audio UART init failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

// ── LEDC channel map ──────────────────────────────────────────

pub const LEDC_CH_SERVO: u32 = 0;
pub const LEDC_CH_EYE_L_R: u32 = 1;
pub const LEDC_CH_EYE_L_G: u32 = 2;
pub const LEDC_CH_EYE_L_B: u32 = 3;
pub const LEDC_CH_EYE_R_R: u32 = 4;
pub const LEDC_CH_EYE_R_G: u32 = 5;
pub const LEDC_CH_EYE_R_B: u32 = 6;

/// `(LEDC channel, GPIO)` for every eye colour pin; left (or shared) first.
const EYE_CHANNELS: [(u32, i32); 6] = [
    (LEDC_CH_EYE_L_R, crate::pins::EYE_LEFT_R_GPIO),
    (LEDC_CH_EYE_L_G, crate::pins::EYE_LEFT_G_GPIO),
    (LEDC_CH_EYE_L_B, crate::pins::EYE_LEFT_B_GPIO),
    (LEDC_CH_EYE_R_R, crate::pins::EYE_RIGHT_R_GPIO),
    (LEDC_CH_EYE_R_G, crate::pins::EYE_RIGHT_G_GPIO),
    (LEDC_CH_EYE_R_B, crate::pins::EYE_RIGHT_B_GPIO),
];

/// Eye channels that carry a signal for `wiring`.
pub fn eye_channels(wiring: EyeWiring) -> &'static [(u32, i32)] {
    match wiring {
        EyeWiring::Shared => &EYE_CHANNELS[..3],
        EyeWiring::Independent => &EYE_CHANNELS[..],
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals(wiring: EyeWiring) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_ledc(wiring)?;
        init_uart()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(wiring: EyeWiring) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped ({:?} eyes)", wiring);
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // PIR output is push-pull; pull-down keeps a disconnected sensor quiet.
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::MOTION_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    info!("hw_init: motion input on GPIO{}", pins::MOTION_GPIO);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    false
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn check_ledc(ret: esp_err_t) -> Result<(), HwInitError> {
    if ret == ESP_OK as i32 {
        Ok(())
    } else {
        Err(HwInitError::LedcInitFailed(ret))
    }
}

#[cfg(target_os = "espidf")]
unsafe fn init_ledc(wiring: EyeWiring) -> Result<(), HwInitError> {
    // Timer 0: servo (50 Hz, 14-bit)
    // SAFETY: Called from single main-task context via init_peripherals().
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_14_BIT,
        freq_hz: pins::SERVO_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    check_ledc(unsafe { ledc_timer_config(&timer0) })?;

    // Timer 1: eye LEDs (1 kHz, 8-bit)
    let timer1 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_1,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::EYE_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    check_ledc(unsafe { ledc_timer_config(&timer1) })?;

    // Channel 0: servo
    check_ledc(unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: LEDC_CH_SERVO,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: pins::SERVO_GPIO,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        })
    })?;

    // Channels 1-3: left (or shared) eye; 4-6: right eye
    let eye_channels = eye_channels(wiring);
    for &(channel, gpio) in eye_channels {
        check_ledc(unsafe {
            ledc_channel_config(&ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel,
                timer_sel: ledc_timer_t_LEDC_TIMER_1,
                gpio_num: gpio,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            })
        })?;
    }

    info!(
        "hw_init: LEDC configured (servo=CH0, eyes=CH1-{})",
        eye_channels.len()
    );
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u32) -> Result<(), ActuatorError> {
    // SAFETY: LEDC channels were configured in init_ledc(); duty register
    // writes are race-free since only the main loop calls this function.
    let ret = unsafe {
        let ret = ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty);
        if ret == ESP_OK as i32 {
            ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel)
        } else {
            ret
        }
    };
    if ret == ESP_OK as i32 {
        Ok(())
    } else {
        Err(ActuatorError::PwmWriteFailed)
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u32) -> Result<(), ActuatorError> {
    Ok(())
}

// ── Audio UART ────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_uart() -> Result<(), HwInitError> {
    let cfg = uart_config_t {
        baud_rate: pins::AUDIO_BAUD,
        data_bits: uart_word_length_t_UART_DATA_8_BITS,
        parity: uart_parity_t_UART_PARITY_DISABLE,
        stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
        flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
        ..Default::default()
    };
    // SAFETY: one-time driver install on a port nothing else uses.
    unsafe {
        let ret = uart_param_config(pins::AUDIO_UART_PORT, &cfg);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::UartInitFailed(ret));
        }
        // -1 = UART_PIN_NO_CHANGE for RTS/CTS
        let ret = uart_set_pin(pins::AUDIO_UART_PORT, pins::AUDIO_TX_GPIO, pins::AUDIO_RX_GPIO, -1, -1);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::UartInitFailed(ret));
        }
        // RX buffer is mandatory even though replies are never read.
        let ret = uart_driver_install(pins::AUDIO_UART_PORT, 256, 0, 0, core::ptr::null_mut(), 0);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::UartInitFailed(ret));
        }
    }
    info!("hw_init: audio UART{} at {} baud", pins::AUDIO_UART_PORT, pins::AUDIO_BAUD);
    Ok(())
}

/// Write `bytes` to the audio UART.  Without a TX ring buffer this
/// blocks until every byte is in the hardware FIFO.
#[cfg(target_os = "espidf")]
pub fn uart_write(bytes: &[u8]) -> Result<(), ActuatorError> {
    // SAFETY: driver installed in init_uart(); `bytes` is valid for the
    // whole call, which returns only once it has been copied out.
    let written = unsafe {
        uart_write_bytes(
            pins::AUDIO_UART_PORT,
            bytes.as_ptr().cast(),
            bytes.len(),
        )
    };
    if written == bytes.len() as i32 {
        Ok(())
    } else {
        Err(ActuatorError::UartWriteFailed)
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_write(_bytes: &[u8]) -> Result<(), ActuatorError> {
    Ok(())
}
