//! Log Decoder
//!
//! Purpose:
//!     Turn a RawLogRecord into a DecodedEvent using an EventDescriptor.
//!     Explicit field-by-field interpreter: no reflection, every failure is
//!     a DecodeError value.
//!
//! Created: 2026-10-18
//!
//! Layout rules:
//!     - Indexed fields come from topics, starting at topic 1 (topic 0 is the
//!       signature hash; anonymous events start at topic 0).
//!     - Indexed value types are the 32-byte word itself; indexed reference
//!       types (bytes, string, arrays, tuples) are only present as a hash.
//!     - Non-indexed fields are read from the payload head in declared order.
//!       bytes/string slots hold an offset to `length(32) | raw bytes`.
//!
//! Error order:
//!     Truncated (payload shape) → MissingTopics → per-field errors in
//!     declared order (InvalidOffset, Truncated, UnsupportedType).

use alloy::primitives::{Address, Bytes, B256, I256, U256};
use tracing::trace;

use crate::error::DecodeError;
use crate::schema::{EventDescriptor, Field, FieldType, WORD};
use crate::types::{DecodedEvent, DecodedValue, RawLogRecord};

/// Stateless ABI log decoder. Cheap to copy, safe to share.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDecoder;

impl LogDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one record. Deterministic and side-effect free.
    pub fn decode(
        &self,
        record: &RawLogRecord,
        descriptor: &EventDescriptor,
    ) -> Result<DecodedEvent, DecodeError> {
        let data = record.data.as_ref();

        if descriptor.data_fields().next().is_some() {
            let head_len = descriptor.head_len().ok_or(DecodeError::Truncated {
                needed: usize::MAX,
                available: data.len(),
            })?;
            if data.len() % WORD != 0 {
                let padded = data.len().div_ceil(WORD) * WORD;
                return Err(DecodeError::Truncated {
                    needed: padded.max(head_len),
                    available: data.len(),
                });
            }
            if data.len() < head_len {
                return Err(DecodeError::Truncated {
                    needed: head_len,
                    available: data.len(),
                });
            }
        }

        let required_topics = descriptor.required_topics();
        if record.topics.len() < required_topics {
            return Err(DecodeError::MissingTopics {
                needed: required_topics,
                available: record.topics.len(),
            });
        }

        let mut topic = descriptor.first_field_topic();
        let mut head = 0usize;
        let mut fields = Vec::with_capacity(descriptor.fields().len());

        for field in descriptor.fields() {
            let value = if field.indexed {
                let word = &record.topics[topic];
                topic += 1;
                decode_topic(&field.ty, word)
            } else {
                let value = decode_data_field(field, data, head)?;
                // Bounded by head_len, checked above
                head += field.ty.head_words().unwrap_or(0) * WORD;
                value
            };
            fields.push((field.name.clone(), value));
        }

        trace!(
            "Decoded {} ({} fields) from {:?}",
            descriptor.name(),
            fields.len(),
            record.address
        );

        Ok(DecodedEvent {
            event: descriptor.name().to_string(),
            address: record.address,
            fields,
            provenance: record.provenance.clone(),
        })
    }
}

fn decode_topic(ty: &FieldType, word: &B256) -> DecodedValue {
    decode_word(ty, word.as_slice()).unwrap_or(DecodedValue::TopicHash(*word))
}

/// Interpret a single 32-byte word. None for non-value types.
fn decode_word(ty: &FieldType, word: &[u8]) -> Option<DecodedValue> {
    debug_assert_eq!(word.len(), WORD);
    let value = match ty {
        FieldType::Address => DecodedValue::Address(Address::from_slice(&word[12..])),
        FieldType::Bool => DecodedValue::Bool(word.iter().any(|b| *b != 0)),
        FieldType::Uint(_) => DecodedValue::Uint(U256::from_be_slice(word)),
        // Signed values are sign-extended to the full word
        FieldType::Int(_) => DecodedValue::Int(I256::from_raw(U256::from_be_slice(word))),
        FieldType::FixedBytes(n) => {
            DecodedValue::FixedBytes(Bytes::copy_from_slice(&word[..*n as usize]))
        }
        _ => return None,
    };
    Some(value)
}

fn decode_data_field(field: &Field, data: &[u8], head: usize) -> Result<DecodedValue, DecodeError> {
    let slot = data
        .get(head..head.saturating_add(WORD))
        .ok_or(DecodeError::Truncated {
            needed: head.saturating_add(WORD),
            available: data.len(),
        })?;
    if let Some(value) = decode_word(&field.ty, slot) {
        return Ok(value);
    }

    match field.ty {
        FieldType::Bytes => Ok(DecodedValue::Bytes(read_dynamic(field, data, slot)?)),
        FieldType::String => {
            let raw = read_dynamic(field, data, slot)?;
            Ok(DecodedValue::String(String::from_utf8_lossy(&raw).into_owned()))
        }
        _ => Err(DecodeError::UnsupportedType {
            field: field.name.clone(),
            tag: field.ty.canonical(),
        }),
    }
}

/// Follow a head slot to `length | bytes` in the tail
fn read_dynamic(field: &Field, data: &[u8], slot: &[u8]) -> Result<Bytes, DecodeError> {
    let offset_word = U256::from_be_slice(slot);
    let offset = match word_to_usize(offset_word) {
        Some(o) if o.checked_add(WORD).is_some_and(|end| end <= data.len()) => o,
        _ => {
            return Err(DecodeError::InvalidOffset {
                field: field.name.clone(),
                offset: offset_word.to_string(),
                len: data.len(),
            })
        }
    };

    let body_start = offset + WORD;
    let length_word = U256::from_be_slice(&data[offset..body_start]);
    let length = word_to_usize(length_word).unwrap_or(usize::MAX);
    let body_end = body_start.saturating_add(length);
    if body_end > data.len() {
        return Err(DecodeError::Truncated {
            needed: body_end,
            available: data.len(),
        });
    }

    Ok(Bytes::copy_from_slice(&data[body_start..body_end]))
}

fn word_to_usize(word: U256) -> Option<usize> {
    if word > U256::from(usize::MAX) {
        None
    } else {
        Some(word.to::<usize>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::IUniswapV3PoolEvents;
    use crate::schema::SchemaRegistry;
    use crate::types::Provenance;
    use alloy::primitives::aliases::{I24, U160};
    use alloy::primitives::keccak256;
    use alloy::sol;
    use alloy::sol_types::SolEvent;

    const SWAP_SCHEMA: &str = r#"[{"type":"event","name":"Swap","anonymous":false,"inputs":[
        {"name":"from","type":"address","indexed":true},
        {"name":"to","type":"address","indexed":true},
        {"name":"amount","type":"uint256","indexed":false}]}]"#;

    sol! {
        event Note(address indexed author, uint256 id, string text, bytes blob);
        event Tagged(string indexed tag, uint8 level);
        event Batch(uint256[] amounts);
    }

    fn swap_descriptor() -> EventDescriptor {
        SchemaRegistry::load(SWAP_SCHEMA)
            .unwrap()
            .resolve("Swap")
            .unwrap()
            .clone()
    }

    fn word(value: u64) -> Vec<u8> {
        B256::from(U256::from(value)).to_vec()
    }

    fn swap_record(data: Vec<u8>) -> RawLogRecord {
        let descriptor = swap_descriptor();
        RawLogRecord::new(
            Address::repeat_byte(0x99),
            vec![
                descriptor.signature_hash(),
                Address::repeat_byte(0x01).into_word(),
                Address::repeat_byte(0x02).into_word(),
            ],
            data,
        )
    }

    #[test]
    fn test_swap_scenario_decodes() {
        let record = swap_record(word(1000));
        let event = LogDecoder::new().decode(&record, &swap_descriptor()).unwrap();

        assert_eq!(event.event, "Swap");
        assert_eq!(event.address, Address::repeat_byte(0x99));
        assert_eq!(
            event.get("from").and_then(|v| v.as_address()),
            Some(Address::repeat_byte(0x01))
        );
        assert_eq!(
            event.get("to").and_then(|v| v.as_address()),
            Some(Address::repeat_byte(0x02))
        );
        assert_eq!(
            event.get("amount").and_then(|v| v.as_uint()),
            Some(U256::from(1000u64))
        );
        let names: Vec<&str> = event.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["from", "to", "amount"]);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let record = swap_record(word(1000));
        let descriptor = swap_descriptor();
        let decoder = LogDecoder::new();
        let first = decoder.decode(&record, &descriptor).unwrap();
        for _ in 0..5 {
            assert_eq!(decoder.decode(&record, &descriptor).unwrap(), first);
        }
    }

    #[test]
    fn test_empty_payload_is_truncated() {
        let err = LogDecoder::new()
            .decode(&swap_record(Vec::new()), &swap_descriptor())
            .unwrap_err();
        assert_eq!(err, DecodeError::Truncated { needed: 32, available: 0 });
    }

    #[test]
    fn test_unaligned_payload_is_truncated() {
        for len in [1usize, 31, 33, 63] {
            let err = LogDecoder::new()
                .decode(&swap_record(vec![0u8; len]), &swap_descriptor())
                .unwrap_err();
            assert!(matches!(err, DecodeError::Truncated { .. }), "len {}", len);
        }
    }

    #[test]
    fn test_missing_topics() {
        let mut record = swap_record(word(1));
        record.topics.truncate(2);
        let err = LogDecoder::new().decode(&record, &swap_descriptor()).unwrap_err();
        assert_eq!(err, DecodeError::MissingTopics { needed: 3, available: 2 });

        record.topics.clear();
        assert!(matches!(
            LogDecoder::new().decode(&record, &swap_descriptor()),
            Err(DecodeError::MissingTopics { needed: 3, available: 0 })
        ));
    }

    #[test]
    fn test_extra_topics_and_trailing_words_are_ignored() {
        let mut record = swap_record([word(5), word(6)].concat());
        record.topics.push(B256::repeat_byte(0x77));
        let event = LogDecoder::new().decode(&record, &swap_descriptor()).unwrap();
        assert_eq!(event.get("amount").and_then(|v| v.as_uint()), Some(U256::from(5u64)));
    }

    #[test]
    fn test_v3_swap_with_signed_fields() {
        let registry = SchemaRegistry::load(crate::contracts::UNISWAP_V3_POOL_ABI).unwrap();
        let swap = IUniswapV3PoolEvents::Swap {
            sender: Address::repeat_byte(0x0a),
            recipient: Address::repeat_byte(0x0b),
            amount0: I256::try_from(-1_500_000i64).unwrap(),
            amount1: I256::try_from(2_000_000_000_000i64).unwrap(),
            sqrtPriceX96: U160::from(79_228_162_514_264_337u64),
            liquidity: 123_456_789u128,
            tick: I24::try_from(-887_220i32).unwrap(),
        };
        let log = swap.encode_log_data();
        let record = RawLogRecord::new(Address::repeat_byte(0xcc), log.topics().to_vec(), log.data.clone());

        let event = registry.decode("Swap", &record).unwrap();
        assert_eq!(
            event.get("amount0").and_then(|v| v.as_int()),
            Some(I256::try_from(-1_500_000i64).unwrap())
        );
        assert_eq!(
            event.get("tick").and_then(|v| v.as_int()),
            Some(I256::try_from(-887_220i64).unwrap())
        );
        assert_eq!(
            event.get("liquidity").and_then(|v| v.as_uint()),
            Some(U256::from(123_456_789u64))
        );
        assert_eq!(
            event.get("recipient").and_then(|v| v.as_address()),
            Some(Address::repeat_byte(0x0b))
        );
    }

    #[test]
    fn test_dynamic_string_and_bytes() {
        let note = Note {
            author: Address::repeat_byte(0x0c),
            id: U256::from(9u64),
            text: "pool rebalanced".to_string(),
            blob: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
        };
        let log = note.encode_log_data();
        let text = r#"[{"type":"event","name":"Note","anonymous":false,"inputs":[
            {"name":"author","type":"address","indexed":true},
            {"name":"id","type":"uint256","indexed":false},
            {"name":"text","type":"string","indexed":false},
            {"name":"blob","type":"bytes","indexed":false}]}]"#;
        let registry = SchemaRegistry::load(text).unwrap();
        assert_eq!(registry.resolve("Note").unwrap().signature_hash(), Note::SIGNATURE_HASH);

        let record = RawLogRecord::new(Address::ZERO, log.topics().to_vec(), log.data.clone());
        let event = registry.decode("Note", &record).unwrap();
        assert_eq!(event.get("text").and_then(|v| v.as_str()), Some("pool rebalanced"));
        assert_eq!(
            event.get("blob"),
            Some(&DecodedValue::Bytes(Bytes::from(vec![0xde, 0xad, 0xbe, 0xef])))
        );
        assert_eq!(event.get("id").and_then(|v| v.as_uint()), Some(U256::from(9u64)));
    }

    fn blob_descriptor() -> EventDescriptor {
        EventDescriptor::new("Blob", vec![Field::new("payload", FieldType::Bytes, false)], false)
    }

    #[test]
    fn test_offset_outside_payload_is_invalid() {
        let descriptor = blob_descriptor();
        let record = RawLogRecord::new(
            Address::ZERO,
            vec![descriptor.signature_hash()],
            [word(0x1000), word(0)].concat(),
        );
        let err = LogDecoder::new().decode(&record, &descriptor).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidOffset { ref field, len: 64, .. } if field == "payload"));

        // offset too large for usize
        let record = RawLogRecord::new(
            Address::ZERO,
            vec![descriptor.signature_hash()],
            B256::repeat_byte(0xff).to_vec(),
        );
        assert!(matches!(
            LogDecoder::new().decode(&record, &descriptor),
            Err(DecodeError::InvalidOffset { .. })
        ));
    }

    #[test]
    fn test_length_past_payload_is_truncated() {
        let descriptor = blob_descriptor();
        // offset 32, length 64, only 32 body bytes
        let record = RawLogRecord::new(
            Address::ZERO,
            vec![descriptor.signature_hash()],
            [word(32), word(64), word(0)].concat(),
        );
        let err = LogDecoder::new().decode(&record, &descriptor).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { needed: 128, available: 96 });
    }

    #[test]
    fn test_array_in_payload_is_unsupported() {
        let log = Batch { amounts: vec![U256::from(1u64), U256::from(2u64)] }.encode_log_data();
        let descriptor = EventDescriptor::new(
            "Batch",
            vec![Field::new(
                "amounts",
                FieldType::Array { inner: Box::new(FieldType::Uint(256)), len: None },
                false,
            )],
            false,
        );
        let record = RawLogRecord::new(Address::ZERO, log.topics().to_vec(), log.data.clone());
        let err = LogDecoder::new().decode(&record, &descriptor).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnsupportedType {
                field: "amounts".to_string(),
                tag: "uint256[]".to_string(),
            }
        );
    }

    fn fixed_array_descriptor(len: usize) -> EventDescriptor {
        EventDescriptor::new(
            "Z",
            vec![Field::new(
                "a",
                FieldType::Array { inner: Box::new(FieldType::Uint(256)), len: Some(len) },
                false,
            )],
            false,
        )
    }

    #[test]
    fn test_zero_width_field_on_empty_payload_is_truncated() {
        let descriptor = fixed_array_descriptor(0);
        assert_eq!(descriptor.head_len(), Some(0));
        let record = RawLogRecord::new(Address::ZERO, vec![descriptor.signature_hash()], Vec::new());
        assert_eq!(
            LogDecoder::new().decode(&record, &descriptor).unwrap_err(),
            DecodeError::Truncated { needed: 32, available: 0 }
        );
    }

    #[test]
    fn test_overflowing_layout_is_truncated() {
        let descriptor = fixed_array_descriptor(1 << 60);
        let record = RawLogRecord::new(
            Address::ZERO,
            vec![descriptor.signature_hash()],
            B256::ZERO.to_vec(),
        );
        assert_eq!(
            LogDecoder::new().decode(&record, &descriptor).unwrap_err(),
            DecodeError::Truncated { needed: usize::MAX, available: 32 }
        );
    }

    #[test]
    fn test_indexed_string_yields_topic_hash() {
        // sol! exposes indexed reference types as their hash
        let log = Tagged { tag: keccak256("hot"), level: 3 }.encode_log_data();
        let descriptor = EventDescriptor::new(
            "Tagged",
            vec![
                Field::new("tag", FieldType::String, true),
                Field::new("level", FieldType::Uint(8), false),
            ],
            false,
        );
        let record = RawLogRecord::new(Address::ZERO, log.topics().to_vec(), log.data.clone());
        let event = LogDecoder::new().decode(&record, &descriptor).unwrap();
        assert_eq!(event.get("tag"), Some(&DecodedValue::TopicHash(keccak256("hot"))));
        assert_eq!(event.get("level").and_then(|v| v.as_uint()), Some(U256::from(3u64)));
    }

    #[test]
    fn test_anonymous_event_reads_topic_zero() {
        let descriptor = EventDescriptor::new(
            "Ping",
            vec![
                Field::new("who", FieldType::Address, true),
                Field::new("ok", FieldType::Bool, false),
                Field::new("tag", FieldType::FixedBytes(4), false),
            ],
            true,
        );
        let mut tag = [0u8; 32];
        tag[..4].copy_from_slice(b"ping");
        let record = RawLogRecord::new(
            Address::ZERO,
            vec![Address::repeat_byte(0x05).into_word()],
            [word(1), tag.to_vec()].concat(),
        );
        let event = LogDecoder::new().decode(&record, &descriptor).unwrap();
        assert_eq!(event.get("who").and_then(|v| v.as_address()), Some(Address::repeat_byte(0x05)));
        assert_eq!(event.get("ok").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(event.get("tag"), Some(&DecodedValue::FixedBytes(Bytes::from_static(b"ping"))));
    }

    #[test]
    fn test_indexed_only_event_ignores_payload() {
        let descriptor = EventDescriptor::new(
            "Touch",
            vec![Field::new("who", FieldType::Address, true)],
            false,
        );
        let record = RawLogRecord::new(
            Address::ZERO,
            vec![descriptor.signature_hash(), Address::repeat_byte(0x03).into_word()],
            vec![0u8; 7],
        );
        assert!(LogDecoder::new().decode(&record, &descriptor).is_ok());
    }

    #[test]
    fn test_provenance_is_carried() {
        let provenance = Provenance {
            block_number: Some(19_000_000),
            block_hash: Some(B256::repeat_byte(0x01)),
            transaction_hash: Some(B256::repeat_byte(0x02)),
            log_index: Some(7),
            removed: true,
        };
        let record = swap_record(word(1)).with_provenance(provenance.clone());
        let event = LogDecoder::new().decode(&record, &swap_descriptor()).unwrap();
        assert_eq!(event.provenance, provenance);
    }
}
