//! Wire codec: one JSON object per datagram, keyed by field name so the
//! collector does not depend on field order. Unknown keys are ignored.

use crate::error::{DecodeError, EncodeError};
use crate::sample::Sample;

pub use crate::constants::MAX_PAYLOAD_SIZE;

/// Serialize a sample to its UTF-8 JSON payload. Percentages are written
/// with the shortest digits that parse back to the same `f64`.
pub fn encode(sample: &Sample) -> Result<Vec<u8>, EncodeError> {
    if let Some((field, value)) = sample.out_of_range() {
        return Err(EncodeError::OutOfRange { field, value });
    }
    Ok(serde_json::to_vec(sample)?)
}

/// Parse a datagram payload. Never panics on adversarial input.
pub fn decode(data: &[u8]) -> Result<Sample, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }
    let text = std::str::from_utf8(data)?;
    let sample: Sample = serde_json::from_str(text)?;

    match sample.out_of_range() {
        Some((field, value)) => Err(DecodeError::OutOfRange { field, value }),
        None => Ok(sample),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample() -> Sample {
        Sample::new(
            "192.168.0.10",
            "collector-1",
            42.5,
            13.2,
            5.0,
            "chrome:123, code:456",
        )
    }

    #[test]
    fn test_round_trip() {
        let s = sample();
        assert_eq!(decode(&encode(&s).unwrap()).unwrap(), s);
    }

    #[test]
    fn test_round_trip_boundaries_and_unicode() {
        let s = Sample::new("::1", "coletor-ção", 0.0, 100.0, 33.33, "");
        assert_eq!(decode(&encode(&s).unwrap()).unwrap(), s);
    }

    /// Builds the payload directly so values skip the two-decimal rounding
    /// of `Sample::new`.
    fn payload(source: &str, memory: f64, cpu: f64, disk: f64, processes: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "ip_origem": source,
            "ip_destino": "collector",
            "uso_memoria": memory,
            "uso_cpu": cpu,
            "uso_disco": disk,
            "processos": processes,
        }))
        .unwrap()
    }

    fn assert_bit_exact(memory: f64, cpu: f64, disk: f64) {
        let first = decode(&payload("10.0.0.1", memory, cpu, disk, "")).unwrap();
        let second = decode(&encode(&first).unwrap()).unwrap();
        assert_eq!(second, first);
        for (got, want) in [
            (second.memory_utilization_pct(), memory),
            (second.cpu_utilization_pct(), cpu),
            (second.disk_utilization_pct(), disk),
        ] {
            assert_eq!(got.to_bits(), want.to_bits(), "{got} != {want}");
        }
    }

    #[test]
    fn test_round_trip_is_bit_exact_at_edges() {
        assert_bit_exact(0.0, 100.0, 50.0);
        assert_bit_exact(39.430133835633676, 0.1 + 0.2, 99.99999999999999);
        assert_bit_exact(f64::MIN_POSITIVE, 5e-324, 2.2250738585072009e-308);
        assert_bit_exact(1e-7, 12.345678901234567, 100.0 - f64::EPSILON * 64.0);
    }

    fn percentage() -> impl Strategy<Value = f64> {
        prop_oneof![
            0.0f64..=100.0,
            // positive subnormals
            (1u64..(1u64 << 52)).prop_map(f64::from_bits),
            Just(0.0),
            Just(100.0),
        ]
    }

    proptest! {
        #[test]
        fn test_round_trip_generated(
            memory in percentage(),
            cpu in percentage(),
            disk in percentage(),
            source in "[0-9a-f:.]{1,39}",
            processes in any::<String>(),
        ) {
            let first = decode(&payload(&source, memory, cpu, disk, &processes)).unwrap();
            let second = decode(&encode(&first).unwrap()).unwrap();
            prop_assert_eq!(&second, &first);
            prop_assert_eq!(second.memory_utilization_pct().to_bits(), memory.to_bits());
            prop_assert_eq!(second.cpu_utilization_pct().to_bits(), cpu.to_bits());
            prop_assert_eq!(second.disk_utilization_pct().to_bits(), disk.to_bits());
            prop_assert_eq!(second.source_address(), source.as_str());
            prop_assert_eq!(second.process_summary(), processes.as_str());
        }
    }

    #[test]
    fn test_encode_rejects_out_of_range_sample() {
        let bad: Sample = serde_json::from_str(
            r#"{"ip_origem":"a","ip_destino":"b","uso_memoria":1,"uso_cpu":250,"uso_disco":1,"processos":""}"#,
        )
        .unwrap();
        assert!(matches!(
            encode(&bad),
            Err(EncodeError::OutOfRange { field: "uso_cpu", .. })
        ));
    }

    #[test]
    fn test_encode_uses_wire_keys() {
        let value: serde_json::Value = serde_json::from_slice(&encode(&sample()).unwrap()).unwrap();
        for key in [
            "ip_origem",
            "ip_destino",
            "uso_memoria",
            "uso_cpu",
            "uso_disco",
            "processos",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_decode_ignores_order_and_unknown_fields() {
        let payload = br#"{"processos":"","uso_disco":1.5,"extra":[1,2],"uso_cpu":2,
            "uso_memoria":3.25,"ip_destino":"b","ip_origem":"a"}"#;
        let s = decode(payload).unwrap();
        assert_eq!(s.source_address(), "a");
        assert_eq!(s.cpu_utilization_pct(), 2.0);
        assert_eq!(s.memory_utilization_pct(), 3.25);
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode(b""), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_decode_not_json() {
        assert!(matches!(decode(b"not-json"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_decode_non_utf8() {
        assert!(matches!(
            decode(&[0x7b, 0xff, 0xfe, 0x7d]),
            Err(DecodeError::Utf8(_))
        ));
    }

    #[test]
    fn test_decode_truncated() {
        let payload = encode(&sample()).unwrap();
        for cut in [1, payload.len() / 2, payload.len() - 1] {
            assert!(decode(&payload[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn test_decode_missing_field() {
        let payload = br#"{"ip_origem":"a","ip_destino":"b","uso_memoria":1,"uso_cpu":1,"uso_disco":1}"#;
        assert!(matches!(decode(payload), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_decode_wrong_type() {
        let payload = br#"{"ip_origem":"a","ip_destino":"b","uso_memoria":"high","uso_cpu":1,"uso_disco":1,"processos":""}"#;
        assert!(decode(payload).is_err());
    }

    #[test]
    fn test_decode_out_of_range() {
        let payload = br#"{"ip_origem":"a","ip_destino":"b","uso_memoria":1,"uso_cpu":250,"uso_disco":1,"processos":""}"#;
        assert!(matches!(
            decode(payload),
            Err(DecodeError::OutOfRange { field: "uso_cpu", .. })
        ));
    }

    #[test]
    fn test_encoded_sample_fits_payload() {
        let procs = (0..10)
            .map(|i| format!("process-name-{i}:{}", 100_000 + i))
            .collect::<Vec<_>>()
            .join(", ");
        let s = Sample::new("255.255.255.255", "collector", 1.0, 2.0, 3.0, procs);
        assert!(encode(&s).unwrap().len() <= MAX_PAYLOAD_SIZE);
    }
}
