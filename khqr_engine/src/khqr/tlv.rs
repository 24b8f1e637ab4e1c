//! Tag-length-value fields.
//!
//! Every field in the payload is a two-digit tag, a two-digit zero-padded byte length and the value itself.
//! Groups (merchant account, additional data) are formed by encoding the child fields, concatenating them and using
//! the result as the value of the parent tag.

use super::KhqrError;

/// Largest value that fits in a two-digit length field.
pub const MAX_VALUE_LEN: usize = 99;
pub const CRC_TAG: &str = "63";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvField {
    pub tag: String,
    pub value: String,
}

impl TlvField {
    /// Decodes the value of this field as a nested group.
    pub fn children(&self) -> Result<Vec<TlvField>, KhqrError> {
        decode_fields(&self.value)
    }
}

fn check_tag(tag: &str) -> Result<(), KhqrError> {
    if tag.len() == 2 && tag.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(KhqrError::InvalidTag(tag.to_string()))
    }
}

pub fn encode_field(tag: &str, value: &str) -> Result<String, KhqrError> {
    check_tag(tag)?;
    let length = value.len();
    if length > MAX_VALUE_LEN {
        return Err(KhqrError::FieldTooLong { tag: tag.to_string(), length });
    }
    Ok(format!("{tag}{length:02}{value}"))
}

/// Encodes `children` in order and wraps the concatenation as the value of `tag`.
pub fn encode_group(tag: &str, children: &[(&str, &str)]) -> Result<String, KhqrError> {
    let inner = children.iter().map(|(t, v)| encode_field(t, v)).collect::<Result<String, _>>()?;
    encode_field(tag, &inner)
}

/// Splits a flat TLV string into its fields. Nested groups are left encoded; see [`TlvField::children`].
pub fn decode_fields(data: &str) -> Result<Vec<TlvField>, KhqrError> {
    let mut fields = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let header = rest.get(..4).ok_or_else(|| KhqrError::MalformedPayload(format!("Truncated header: {rest}")))?;
        let (tag, length) = header.split_at(2);
        check_tag(tag)?;
        let length = length
            .parse::<usize>()
            .map_err(|_| KhqrError::MalformedPayload(format!("Invalid length '{length}' for tag {tag}")))?;
        let value = rest.get(4..4 + length).ok_or_else(|| {
            KhqrError::MalformedPayload(format!("Tag {tag} declares {length} bytes but the data is shorter"))
        })?;
        fields.push(TlvField { tag: tag.to_string(), value: value.to_string() });
        rest = &rest[4 + length..];
    }
    Ok(fields)
}

pub fn find_field<'a>(fields: &'a [TlvField], tag: &str) -> Option<&'a TlvField> {
    fields.iter().find(|f| f.tag == tag)
}
