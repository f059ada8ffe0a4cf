//! Event descriptors
//!
//! An EventDescriptor is the compiled form of one ABI event entry: its name,
//! its ordered fields (type tag + indexed flag) and whether it is anonymous.
//! Field order is decode order.
//!
//! Type tags are parsed by alloy's `DynSolType` grammar and narrowed to the
//! subset the log decoder interprets.

use alloy::dyn_abi::DynSolType;
use alloy::primitives::{keccak256, B256};
use std::fmt;

/// Slot width of the ABI encoding
pub const WORD: usize = 32;

/// Semantic type tag of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Address,
    Bool,
    /// uintN, N in 8..=256 step 8
    Uint(u16),
    /// intN, N in 8..=256 step 8
    Int(u16),
    /// bytesN, N in 1..=32
    FixedBytes(u8),
    Bytes,
    String,
    /// T[] (len = None) or T[k]
    Array {
        inner: Box<FieldType>,
        len: Option<usize>,
    },
    Tuple(Vec<FieldType>),
}

impl FieldType {
    /// Parse an ABI type tag (`uint24`, `address[]`, `(address,uint8)[2]`).
    /// Returns None for unknown tags, function pointers and zero-length
    /// fixed arrays.
    pub fn parse(tag: &str) -> Option<Self> {
        DynSolType::parse(tag.trim())
            .ok()
            .and_then(|ty| Self::from_sol_type(&ty))
    }

    /// Map an alloy dynamic type onto the decoder's type tags
    pub fn from_sol_type(ty: &DynSolType) -> Option<Self> {
        let field = match ty {
            DynSolType::Address => FieldType::Address,
            DynSolType::Bool => FieldType::Bool,
            DynSolType::Uint(bits) => FieldType::Uint(u16::try_from(*bits).ok()?),
            DynSolType::Int(bits) => FieldType::Int(u16::try_from(*bits).ok()?),
            DynSolType::FixedBytes(n) => FieldType::FixedBytes(u8::try_from(*n).ok()?),
            DynSolType::Bytes => FieldType::Bytes,
            DynSolType::String => FieldType::String,
            DynSolType::Array(inner) => FieldType::Array {
                inner: Box::new(Self::from_sol_type(inner)?),
                len: None,
            },
            DynSolType::FixedArray(_, 0) => return None,
            DynSolType::FixedArray(inner, k) => FieldType::Array {
                inner: Box::new(Self::from_sol_type(inner)?),
                len: Some(*k),
            },
            DynSolType::Tuple(members) if !members.is_empty() => FieldType::Tuple(
                members
                    .iter()
                    .map(Self::from_sol_type)
                    .collect::<Option<Vec<_>>>()?,
            ),
            _ => return None,
        };
        Some(field)
    }

    /// Canonical form used in event signatures (`uint` -> `uint256`, tuples as `(..)`)
    pub fn canonical(&self) -> String {
        match self {
            FieldType::Address => "address".to_string(),
            FieldType::Bool => "bool".to_string(),
            FieldType::Uint(bits) => format!("uint{}", bits),
            FieldType::Int(bits) => format!("int{}", bits),
            FieldType::FixedBytes(n) => format!("bytes{}", n),
            FieldType::Bytes => "bytes".to_string(),
            FieldType::String => "string".to_string(),
            FieldType::Array { inner, len: None } => format!("{}[]", inner.canonical()),
            FieldType::Array {
                inner,
                len: Some(k),
            } => format!("{}[{}]", inner.canonical(), k),
            FieldType::Tuple(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.canonical()).collect();
                format!("({})", parts.join(","))
            }
        }
    }

    /// Encoded as an offset in the head, with the body in the tail
    pub fn is_dynamic(&self) -> bool {
        match self {
            FieldType::Bytes | FieldType::String => true,
            FieldType::Array { len: None, .. } => true,
            FieldType::Array { inner, .. } => inner.is_dynamic(),
            FieldType::Tuple(members) => members.iter().any(|m| m.is_dynamic()),
            _ => false,
        }
    }

    /// Fits in one 32-byte word and is stored verbatim when indexed
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            FieldType::Address
                | FieldType::Bool
                | FieldType::Uint(_)
                | FieldType::Int(_)
                | FieldType::FixedBytes(_)
        )
    }

    /// Number of head slots this type occupies in the data payload.
    /// None when a fixed-size layout overflows `usize`.
    pub fn head_words(&self) -> Option<usize> {
        if self.is_dynamic() {
            return Some(1);
        }
        match self {
            FieldType::Array {
                inner,
                len: Some(k),
            } => inner.head_words()?.checked_mul(*k),
            FieldType::Tuple(members) => members
                .iter()
                .try_fold(0usize, |acc, m| acc.checked_add(m.head_words()?)),
            _ => Some(1),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// One event parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub indexed: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType, indexed: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            indexed,
        }
    }
}

/// Compiled event layout. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    name: String,
    fields: Vec<Field>,
    anonymous: bool,
}

impl EventDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<Field>, anonymous: bool) -> Self {
        Self {
            name: name.into(),
            fields,
            anonymous,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// `Name(type1,type2,...)`
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.fields.iter().map(|f| f.ty.canonical()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// keccak256 of the signature, emitted as topic 0 by non-anonymous events
    pub fn signature_hash(&self) -> B256 {
        keccak256(self.signature().as_bytes())
    }

    /// Index of the first topic that carries an indexed field
    pub fn first_field_topic(&self) -> usize {
        if self.anonymous {
            0
        } else {
            1
        }
    }

    pub fn indexed_count(&self) -> usize {
        self.fields.iter().filter(|f| f.indexed).count()
    }

    /// Minimum number of topics a matching log carries
    pub fn required_topics(&self) -> usize {
        self.first_field_topic() + self.indexed_count()
    }

    pub fn data_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.indexed)
    }

    /// Byte length of the payload head (one slot per dynamic field).
    /// None when the layout does not fit in `usize`.
    pub fn head_len(&self) -> Option<usize> {
        self.data_fields().try_fold(0usize, |acc, f| {
            acc.checked_add(f.ty.head_words()?.checked_mul(WORD)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_elementary_tags() {
        assert_eq!(FieldType::parse("address"), Some(FieldType::Address));
        assert_eq!(FieldType::parse("uint"), Some(FieldType::Uint(256)));
        assert_eq!(FieldType::parse("int24"), Some(FieldType::Int(24)));
        assert_eq!(FieldType::parse("uint160"), Some(FieldType::Uint(160)));
        assert_eq!(FieldType::parse("bytes32"), Some(FieldType::FixedBytes(32)));
        assert_eq!(FieldType::parse("bytes"), Some(FieldType::Bytes));
    }

    #[test]
    fn test_parse_rejects_unknown_tags() {
        assert_eq!(FieldType::parse("uint7"), None);
        assert_eq!(FieldType::parse("uint264"), None);
        assert_eq!(FieldType::parse("bytes33"), None);
        assert_eq!(FieldType::parse("float"), None);
        assert_eq!(FieldType::parse("uint256[x]"), None);
        assert_eq!(FieldType::parse("function"), None);
    }

    #[test]
    fn test_parse_rejects_zero_length_arrays() {
        assert_eq!(FieldType::parse("uint256[0]"), None);
        assert_eq!(FieldType::parse("address[2][0]"), None);
        assert!(FieldType::parse("uint256[1]").is_some());
    }

    #[test]
    fn test_parse_arrays_and_tuples() {
        let arr = FieldType::parse("address[]").unwrap();
        assert!(arr.is_dynamic());
        assert_eq!(arr.canonical(), "address[]");

        let fixed = FieldType::parse("uint256[3]").unwrap();
        assert!(!fixed.is_dynamic());
        assert_eq!(fixed.head_words(), Some(3));

        let tuple = FieldType::parse("(address,uint24)[]").unwrap();
        assert_eq!(tuple.canonical(), "(address,uint24)[]");

        let nested = FieldType::parse("(address,uint24)[2]").unwrap();
        assert_eq!(nested.head_words(), Some(4));
    }

    #[test]
    fn test_oversized_layout_is_none() {
        let huge = FieldType::parse("uint256[1152921504606846976]").unwrap();
        assert_eq!(huge.head_words(), Some(1152921504606846976));

        let ev = EventDescriptor::new("Z", vec![Field::new("a", huge, false)], false);
        assert_eq!(ev.head_len(), None);

        let squared = FieldType::Array {
            inner: Box::new(FieldType::Array {
                inner: Box::new(FieldType::Uint(256)),
                len: Some(usize::MAX),
            }),
            len: Some(2),
        };
        assert_eq!(squared.head_words(), None);
    }

    #[test]
    fn test_v3_swap_signature_hash() {
        let swap = EventDescriptor::new(
            "Swap",
            vec![
                Field::new("sender", FieldType::Address, true),
                Field::new("recipient", FieldType::Address, true),
                Field::new("amount0", FieldType::Int(256), false),
                Field::new("amount1", FieldType::Int(256), false),
                Field::new("sqrtPriceX96", FieldType::Uint(160), false),
                Field::new("liquidity", FieldType::Uint(128), false),
                Field::new("tick", FieldType::Int(24), false),
            ],
            false,
        );
        assert_eq!(
            swap.signature(),
            "Swap(address,address,int256,int256,uint160,uint128,int24)"
        );
        assert_eq!(
            swap.signature_hash(),
            keccak256(b"Swap(address,address,int256,int256,uint160,uint128,int24)")
        );
        assert_eq!(swap.required_topics(), 3);
        assert_eq!(swap.head_len(), Some(5 * WORD));
    }

    #[test]
    fn test_anonymous_event_topics_start_at_zero() {
        let ev = EventDescriptor::new(
            "Ping",
            vec![Field::new("who", FieldType::Address, true)],
            true,
        );
        assert_eq!(ev.first_field_topic(), 0);
        assert_eq!(ev.required_topics(), 1);
    }
}
