fn main() {
    println!("cargo:rerun-if-env-changed=PROPHEAD_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=PROPHEAD_WIFI_PASS");
    println!("cargo:rerun-if-env-changed=PROPHEAD_MQTT_URL");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
