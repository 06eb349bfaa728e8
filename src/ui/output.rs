use std::io::Write;
use crate::analyser::containers::{format_timestamp, FingerprintRecord, Output, Role};
use crate::error::Result;
use ansi_term::Colour;

/// Column names of the delimited record format.
pub const CSV_HEADER: [&str; 13] = [
    "timestamp",
    "sourceIp",
    "destinationIp",
    "sourcePort",
    "destinationPort",
    "role",
    "protocolString",
    "fingerprint",
    "fingerprintInputString",
    "kexAlgs",
    "encAlgs",
    "macAlgs",
    "cmpAlgs",
];

/// One JSON object, no trailing newline.
pub fn data_as_json(output: &Output) -> Result<String> {
    Ok(serde_json::to_string(output)?)
}

/// Delimited writer for fingerprint rows. Every field is quoted, since algorithm lists contain
/// commas. The header is left to the caller.
pub fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer)
}

/// Delimited fields for a fingerprint, in [CSV_HEADER] order. Retransmission events have no
/// delimited form.
pub fn csv_fields(record: &FingerprintRecord) -> [String; 13] {
    [
        format_timestamp(&record.timestamp),
        record.src_ip.clone(),
        record.dst_ip.clone(),
        record.src_port.to_string(),
        record.dst_port.to_string(),
        record.role.to_string(),
        record.protocol.clone().unwrap_or_default(),
        record.hassh.clone(),
        record.hassh_algorithms.clone(),
        record.algorithms.kex.clone(),
        record.algorithms.encryption.clone(),
        record.algorithms.mac.clone(),
        record.algorithms.compression.clone(),
    ]
}

/// Console block for one fingerprint, coloured by role.
pub fn format_summary(record: &FingerprintRecord, capture: Option<&str>) -> String {
    let (name, colour) = match record.role {
        Role::Client => ("Client", Colour::Fixed(220)),
        Role::Server => ("Server", Colour::Fixed(208)),
    };
    let location = capture.map(|capture| format!(" in '{capture}'")).unwrap_or_default();
    let flow = format!(
        "[ {}:{} -> {}:{} ]",
        record.src_ip, record.src_port, record.dst_ip, record.dst_port
    );

    format!(
        "[+] {name} SSH_MSG_KEXINIT detected{location}\n    {}\n        [-] Protocol String: {}\n        [-] {name} HASSH: {}\n        [-] {name} HASSH String: {}",
        Colour::Fixed(81).paint(flow),
        colour.paint(record.protocol.as_deref().unwrap_or_default()),
        colour.paint(&record.hassh),
        Colour::Fixed(181).paint(&record.hassh_algorithms),
    )
}

pub fn print_results(record: &FingerprintRecord, capture: Option<&str>) {
    println!("{}", format_summary(record, capture));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::containers::{AlgorithmSet, RetransmissionEvent, PacketEvent};
    use chrono::DateTime;
    use serde_json::Value;

    fn record() -> FingerprintRecord {
        FingerprintRecord {
            timestamp: DateTime::from_timestamp_micros(1_570_000_000_123_456),
            src_ip: "192.168.1.10".into(),
            dst_ip: "192.168.1.1".into(),
            src_port: 2222,
            dst_port: 22,
            role: Role::Client,
            protocol: Some("SSH-2.0-OpenSSH_8.1 \"patched\"".into()),
            hassh: "492a1b12bc056237f805415b405d8616".into(),
            hassh_algorithms: "curve25519-sha256,ecdh-sha2-nistp256;aes128-ctr,aes256-ctr;hmac-sha2-256;none,zlib@openssh.com".into(),
            algorithms: AlgorithmSet {
                kex: "curve25519-sha256,ecdh-sha2-nistp256".into(),
                encryption: "aes128-ctr,aes256-ctr".into(),
                mac: "hmac-sha2-256".into(),
                compression: "none,zlib@openssh.com".into(),
            },
            peer: AlgorithmSet::default(),
            languages_client_to_server: String::new(),
            languages_server_to_client: String::new(),
        }
    }

    fn csv_text(record: &FingerprintRecord) -> String {
        let mut writer = csv_writer(Vec::new());
        writer.write_record(CSV_HEADER).unwrap();
        writer.write_record(csv_fields(record)).unwrap();
        writer.flush().unwrap();
        String::from_utf8(writer.get_ref().clone()).unwrap()
    }

    #[test]
    fn header_has_thirteen_columns() {
        assert_eq!(
            CSV_HEADER.join(","),
            "timestamp,sourceIp,destinationIp,sourcePort,destinationPort,role,protocolString,\
fingerprint,fingerprintInputString,kexAlgs,encAlgs,macAlgs,cmpAlgs"
        );
    }

    #[test]
    fn row_quotes_free_text() {
        let mut record = record();
        record.protocol = Some("SSH-2.0-OpenSSH_8.1".into());
        record.hassh_algorithms = "a;b;c;d".into();
        record.algorithms = AlgorithmSet {
            kex: "a".into(),
            encryption: "b".into(),
            mac: "c".into(),
            compression: "d".into(),
        };
        let text = csv_text(&record);
        assert_eq!(
            text.lines().nth(1).unwrap(),
            "\"2019-10-02T07:06:40.123456Z\",\"192.168.1.10\",\"192.168.1.1\",\"2222\",\"22\",\"client\",\"SSH-2.0-OpenSSH_8.1\",\"492a1b12bc056237f805415b405d8616\",\"a;b;c;d\",\"a\",\"b\",\"c\",\"d\""
        );
    }

    #[test]
    fn missing_protocol_is_an_empty_column() {
        let mut record = record();
        record.protocol = None;
        assert!(csv_text(&record).contains(",\"client\",\"\","));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let text = csv_text(&record());
        assert!(text.contains("\"SSH-2.0-OpenSSH_8.1 \"\"patched\"\"\""));
    }

    #[test]
    fn row_round_trips_through_a_csv_reader() {
        let record = record();
        let json: Value = serde_json::from_str(&data_as_json(&Output::Fingerprint(record.clone())).unwrap()).unwrap();
        let text = csv_text(&record);

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADER);
        let rows: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.len(), 13);

        let column = |name: &str| {
            let index = CSV_HEADER.iter().position(|column| *column == name).unwrap();
            row.get(index).unwrap().to_string()
        };
        assert_eq!(column("timestamp"), json["timestamp"]);
        assert_eq!(column("sourceIp"), json["sourceIp"]);
        assert_eq!(column("destinationIp"), json["destinationIp"]);
        assert_eq!(column("sourcePort"), json["sourcePort"].to_string());
        assert_eq!(column("destinationPort"), json["destinationPort"].to_string());
        assert_eq!(column("role"), json["hasshType"]);
        assert_eq!(column("protocolString"), json["client"]);
        assert_eq!(column("fingerprint"), json["hassh"]);
        assert_eq!(column("fingerprintInputString"), json["hasshAlgorithms"]);
        assert_eq!(column("kexAlgs"), json["ckex"]);
        assert_eq!(column("encAlgs"), json["ceacts"]);
        assert_eq!(column("macAlgs"), json["cmacts"]);
        assert_eq!(column("cmpAlgs"), json["ccacts"]);
    }

    #[test]
    fn events_serialize_as_json() {
        let packet = PacketEvent {
            src_ip: "192.168.1.10".into(),
            dst_ip: "192.168.1.1".into(),
            ..Default::default()
        };
        let event = Output::Event(RetransmissionEvent::new(&packet, 2222, 22));
        let json = data_as_json(&event).unwrap();

        assert!(json.contains("\"eventType\":\"retransmission\""));
        assert!(!json.contains('\n'));
    }

    #[test]
    fn summary_names_the_capture() {
        let summary = format_summary(&record(), Some("session.pcap"));
        assert!(summary.starts_with("[+] Client SSH_MSG_KEXINIT detected in 'session.pcap'"));
        assert!(summary.contains("192.168.1.10:2222 -> 192.168.1.1:22"));
        assert!(summary.contains("492a1b12bc056237f805415b405d8616"));
        assert!(summary.contains("Client HASSH String"));

        let live = format_summary(&record(), None);
        assert!(live.starts_with("[+] Client SSH_MSG_KEXINIT detected\n"));
    }
}
