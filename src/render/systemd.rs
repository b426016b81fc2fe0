//! Unit file rendering for the Kafka service pair.
//!
//! Kafka needs its coordination service running before the broker starts;
//! the broker unit declares `Requires=`/`After=` on the coordination unit
//! so systemd enforces the ordering on every boot, not just during
//! provisioning.

/// Unit name of the coordination service.
pub const ZOOKEEPER_UNIT: &str = "webstrap-zookeeper";

/// Unit name of the broker service.
pub const KAFKA_UNIT: &str = "webstrap-kafka";

/// Installation prefix of the unpacked Kafka distribution.
pub const KAFKA_HOME: &str = "/opt/kafka";

pub fn zookeeper_unit() -> String {
    format!(
        r#"[Unit]
Description=Apache Zookeeper (webstrap)
After=network.target

[Service]
Type=simple
ExecStart={home}/bin/zookeeper-server-start.sh {home}/config/zookeeper.properties
ExecStop={home}/bin/zookeeper-server-stop.sh
Restart=on-failure

[Install]
WantedBy=multi-user.target
"#,
        home = KAFKA_HOME
    )
}

pub fn kafka_unit() -> String {
    format!(
        r#"[Unit]
Description=Apache Kafka broker (webstrap)
Requires={zookeeper}.service
After={zookeeper}.service network.target

[Service]
Type=simple
ExecStart={home}/bin/kafka-server-start.sh {home}/config/server.properties
ExecStop={home}/bin/kafka-server-stop.sh
Restart=on-failure

[Install]
WantedBy=multi-user.target
"#,
        zookeeper = ZOOKEEPER_UNIT,
        home = KAFKA_HOME
    )
}
