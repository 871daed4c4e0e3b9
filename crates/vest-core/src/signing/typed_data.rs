//! EIP-712 typed structured data hashing.
//!
//! A [`TypeSchema`] declares struct types as ordered field lists. Values are
//! supplied as [`StructValue`] trees and hashed with `hashStruct`:
//!
//! ```text
//! hashStruct(s) = keccak256(typeHash(S) ‖ encodeData(s))
//! typeHash(S)   = keccak256(encodeType(S))
//! digest        = keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ hashStruct(s))
//! ```
//!
//! `encodeType` lists the root definition first, then every referenced
//! struct definition sorted by type name. Both sides of a signature must
//! agree on this ordering byte for byte.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::domain::Domain;
use crate::{Error, Result};

/// Version byte pair prefixed to every typed-data digest.
pub const TYPED_DATA_PREFIX: [u8; 2] = [0x19, 0x01];

/// Supported EIP-712 field types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Address,
    Uint256,
    Bool,
    String,
    Bytes,
    /// Reference to another struct type in the same schema.
    Struct(String),
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "address" => Ok(FieldType::Address),
            "uint256" => Ok(FieldType::Uint256),
            "bool" => Ok(FieldType::Bool),
            "string" => Ok(FieldType::String),
            "bytes" => Ok(FieldType::Bytes),
            other if is_struct_name(other) => Ok(FieldType::Struct(other.to_string())),
            other => Err(Error::encoding(format!("unsupported field type '{}'", other))),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Address => write!(f, "address"),
            FieldType::Uint256 => write!(f, "uint256"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::String => write!(f, "string"),
            FieldType::Bytes => write!(f, "bytes"),
            FieldType::Struct(name) => write!(f, "{}", name),
        }
    }
}

/// Struct type names start with an uppercase ASCII letter, which keeps them
/// apart from the lowercase atomic type tags.
fn is_struct_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A named, typed struct member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Struct type definitions keyed by type name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSchema {
    types: BTreeMap<String, Vec<FieldDef>>,
}

impl TypeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a struct type from already-typed fields.
    pub fn define(mut self, name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        self.types.insert(name.into(), fields);
        self
    }

    /// Add a struct type from `(field name, type tag)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] for an invalid type name, a duplicate type
    /// or field, or an unsupported type tag.
    pub fn add_type(&mut self, name: &str, fields: &[(&str, &str)]) -> Result<()> {
        if !is_struct_name(name) {
            return Err(Error::encoding(format!("invalid struct type name '{}'", name)));
        }
        if self.types.contains_key(name) {
            return Err(Error::encoding(format!("struct type '{}' declared twice", name)));
        }

        let mut defs = Vec::with_capacity(fields.len());
        for (field_name, tag) in fields {
            if defs.iter().any(|d: &FieldDef| d.name == *field_name) {
                return Err(Error::encoding(format!(
                    "field '{}' declared twice in '{}'",
                    field_name, name
                )));
            }
            defs.push(FieldDef::new(*field_name, tag.parse()?));
        }

        self.types.insert(name.to_string(), defs);
        Ok(())
    }

    /// Builder form of [`add_type`](Self::add_type).
    pub fn with_type(mut self, name: &str, fields: &[(&str, &str)]) -> Result<Self> {
        self.add_type(name, fields)?;
        Ok(self)
    }

    /// Declared fields of a struct type, in order.
    pub fn fields(&self, type_name: &str) -> Result<&[FieldDef]> {
        self.types
            .get(type_name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::encoding(format!("unknown struct type '{}'", type_name)))
    }

    /// Canonical `encodeType` string for `root`.
    pub fn type_string(&self, root: &str) -> Result<String> {
        let mut dependencies = BTreeSet::new();
        self.collect_dependencies(root, &mut dependencies)?;
        dependencies.remove(root);

        let mut encoded = self.definition(root)?;
        for dependency in &dependencies {
            encoded.push_str(&self.definition(dependency)?);
        }
        Ok(encoded)
    }

    /// `keccak256(encodeType(root))`.
    pub fn type_hash(&self, root: &str) -> Result<B256> {
        Ok(keccak256(self.type_string(root)?.as_bytes()))
    }

    fn definition(&self, type_name: &str) -> Result<String> {
        let members = self
            .fields(type_name)?
            .iter()
            .map(|field| format!("{} {}", field.kind, field.name))
            .collect::<Vec<_>>()
            .join(",");
        Ok(format!("{}({})", type_name, members))
    }

    fn collect_dependencies(&self, type_name: &str, found: &mut BTreeSet<String>) -> Result<()> {
        if !found.insert(type_name.to_string()) {
            return Ok(());
        }
        for field in self.fields(type_name)? {
            if let FieldType::Struct(dependency) = &field.kind {
                self.collect_dependencies(dependency, found)?;
            }
        }
        Ok(())
    }

    /// Encode one member value to its 32-byte `encodeData` word.
    pub fn encode_value(&self, kind: &FieldType, value: &TypedValue) -> Result<B256> {
        match (kind, value) {
            (FieldType::Address, TypedValue::Address(address)) => {
                Ok(B256::left_padding_from(address.as_slice()))
            }
            (FieldType::Uint256, TypedValue::Uint256(number)) => {
                Ok(B256::from(number.to_be_bytes::<32>()))
            }
            (FieldType::Bool, TypedValue::Bool(flag)) => Ok(B256::with_last_byte(u8::from(*flag))),
            (FieldType::String, TypedValue::String(text)) => Ok(keccak256(text.as_bytes())),
            (FieldType::Bytes, TypedValue::Bytes(bytes)) => Ok(keccak256(bytes)),
            (FieldType::Struct(type_name), TypedValue::Struct(members)) => {
                self.struct_hash(type_name, members)
            }
            (kind, value) => Err(Error::encoding(format!(
                "cannot encode {} value as '{}'",
                value.kind_name(),
                kind
            ))),
        }
    }

    /// `hashStruct` of `values` as an instance of `type_name`.
    ///
    /// Every declared field must be present and no undeclared field may be.
    pub fn struct_hash(&self, type_name: &str, values: &StructValue) -> Result<B256> {
        let fields = self.fields(type_name)?;

        if let Some(extra) = values
            .names()
            .find(|name| !fields.iter().any(|field| field.name == *name))
        {
            return Err(Error::encoding(format!(
                "field '{}' is not declared in '{}'",
                extra, type_name
            )));
        }

        let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
        encoded.extend_from_slice(self.type_hash(type_name)?.as_slice());

        for field in fields {
            let value = values.get(&field.name).ok_or_else(|| {
                Error::encoding(format!("missing field '{}' of '{}'", field.name, type_name))
            })?;
            encoded.extend_from_slice(self.encode_value(&field.kind, value)?.as_slice());
        }

        Ok(keccak256(&encoded))
    }
}

/// A value for one struct member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Address(Address),
    Uint256(U256),
    Bool(bool),
    String(String),
    Bytes(Bytes),
    Struct(StructValue),
}

impl TypedValue {
    fn kind_name(&self) -> &'static str {
        match self {
            TypedValue::Address(_) => "address",
            TypedValue::Uint256(_) => "uint256",
            TypedValue::Bool(_) => "bool",
            TypedValue::String(_) => "string",
            TypedValue::Bytes(_) => "bytes",
            TypedValue::Struct(_) => "struct",
        }
    }
}

impl From<Address> for TypedValue {
    fn from(value: Address) -> Self {
        TypedValue::Address(value)
    }
}

impl From<U256> for TypedValue {
    fn from(value: U256) -> Self {
        TypedValue::Uint256(value)
    }
}

impl From<u64> for TypedValue {
    fn from(value: u64) -> Self {
        TypedValue::Uint256(U256::from(value))
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Bool(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::String(value)
    }
}

impl From<Bytes> for TypedValue {
    fn from(value: Bytes) -> Self {
        TypedValue::Bytes(value)
    }
}

impl From<StructValue> for TypedValue {
    fn from(value: StructValue) -> Self {
        TypedValue::Struct(value)
    }
}

/// Member values of one struct instance, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructValue(BTreeMap<String, TypedValue>);

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<TypedValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.0.get(name)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Final EIP-712 digest for a typed struct under `domain`.
pub fn hash_typed_data(
    domain: &Domain,
    schema: &TypeSchema,
    type_name: &str,
    values: &StructValue,
) -> Result<B256> {
    let domain_separator = domain.separator()?;
    let struct_hash = schema.struct_hash(type_name, values)?;
    let digest = compute_typed_data_hash(domain_separator, struct_hash);

    debug!(
        type_name,
        domain = %domain.name,
        %domain_separator,
        %struct_hash,
        %digest,
        "Computed typed data digest"
    );

    Ok(digest)
}

/// `keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash)`.
pub fn compute_typed_data_hash(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut data = [0u8; 66];
    data[..2].copy_from_slice(&TYPED_DATA_PREFIX);
    data[2..34].copy_from_slice(domain_separator.as_slice());
    data[34..].copy_from_slice(struct_hash.as_slice());
    keccak256(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    fn mail_schema() -> TypeSchema {
        TypeSchema::new()
            .with_type(
                "Mail",
                &[("from", "Person"), ("to", "Person"), ("contents", "string")],
            )
            .unwrap()
            .with_type("Person", &[("name", "string"), ("wallet", "address")])
            .unwrap()
    }

    fn person(name: &str, wallet: &str) -> StructValue {
        StructValue::new()
            .with("name", name)
            .with("wallet", wallet.parse::<Address>().unwrap())
    }

    fn mail() -> StructValue {
        StructValue::new()
            .with("from", person("Cow", "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"))
            .with("to", person("Bob", "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"))
            .with("contents", "Hello, Bob!")
    }

    #[test]
    fn test_field_type_parsing() {
        assert_eq!("address".parse::<FieldType>().unwrap(), FieldType::Address);
        assert_eq!("uint256".parse::<FieldType>().unwrap(), FieldType::Uint256);
        assert_eq!(
            "Person".parse::<FieldType>().unwrap(),
            FieldType::Struct("Person".to_string())
        );
        assert!(matches!("uint8".parse::<FieldType>(), Err(Error::Encoding { .. })));
        assert!(matches!("address[]".parse::<FieldType>(), Err(Error::Encoding { .. })));
        assert!(matches!("".parse::<FieldType>(), Err(Error::Encoding { .. })));
    }

    #[test]
    fn test_flat_type_string() {
        let schema = TypeSchema::new()
            .with_type(
                "SignerProof",
                &[("approvedSigner", "address"), ("signerExpiry", "uint256")],
            )
            .unwrap();

        assert_eq!(
            schema.type_string("SignerProof").unwrap(),
            "SignerProof(address approvedSigner,uint256 signerExpiry)"
        );
    }

    #[test]
    fn test_nested_type_string_and_hash() {
        let schema = mail_schema();
        assert_eq!(
            schema.type_string("Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
        assert_eq!(
            schema.type_hash("Mail").unwrap(),
            b256!("a0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2")
        );
    }

    #[test]
    fn test_referenced_types_sorted_alphabetically() {
        // Declared and referenced out of order on purpose.
        let schema = TypeSchema::new()
            .with_type("Zeta", &[("flag", "bool")])
            .unwrap()
            .with_type("Order", &[("z", "Zeta"), ("a", "Alpha"), ("again", "Zeta")])
            .unwrap()
            .with_type("Mid", &[("value", "uint256")])
            .unwrap()
            .with_type("Alpha", &[("m", "Mid")])
            .unwrap();

        assert_eq!(
            schema.type_string("Order").unwrap(),
            "Order(Zeta z,Alpha a,Zeta again)Alpha(Mid m)Mid(uint256 value)Zeta(bool flag)"
        );
        assert_eq!(schema.type_string("Alpha").unwrap(), "Alpha(Mid m)Mid(uint256 value)");
    }

    #[test]
    fn test_self_referencing_type_terminates() {
        let schema = TypeSchema::new()
            .with_type("Node", &[("value", "uint256"), ("next", "Node")])
            .unwrap();
        assert_eq!(
            schema.type_string("Node").unwrap(),
            "Node(uint256 value,Node next)"
        );
    }

    #[test]
    fn test_unknown_struct_reference_rejected() {
        let schema = TypeSchema::new()
            .with_type("Mail", &[("from", "Person")])
            .unwrap();
        assert!(matches!(schema.type_string("Mail"), Err(Error::Encoding { .. })));
        assert!(matches!(schema.type_hash("Missing"), Err(Error::Encoding { .. })));
    }

    #[test]
    fn test_duplicate_declarations_rejected() {
        let mut schema = TypeSchema::new();
        schema.add_type("Person", &[("name", "string")]).unwrap();
        assert!(schema.add_type("Person", &[("name", "string")]).is_err());
        assert!(schema
            .add_type("Pair", &[("left", "bool"), ("left", "bool")])
            .is_err());
        assert!(schema.add_type("lowercase", &[]).is_err());
    }

    #[test]
    fn test_struct_hash_matches_eip712_reference() {
        let hash = mail_schema().struct_hash("Mail", &mail()).unwrap();
        assert_eq!(
            hash,
            b256!("c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e")
        );
    }

    #[test]
    fn test_encode_value_words() {
        let schema = TypeSchema::new();
        let address: Address = "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826".parse().unwrap();

        let word = schema
            .encode_value(&FieldType::Address, &TypedValue::Address(address))
            .unwrap();
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], address.as_slice());

        let word = schema.encode_value(&FieldType::Bool, &true.into()).unwrap();
        assert_eq!(word, B256::with_last_byte(1));

        let word = schema.encode_value(&FieldType::Uint256, &258u64.into()).unwrap();
        assert_eq!(word[30], 1);
        assert_eq!(word[31], 2);

        let word = schema
            .encode_value(&FieldType::Bytes, &Bytes::from_static(b"abc").into())
            .unwrap();
        assert_eq!(word, keccak256(b"abc"));
        let word = schema.encode_value(&FieldType::String, &"abc".into()).unwrap();
        assert_eq!(word, keccak256(b"abc"));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let schema = TypeSchema::new();
        let result = schema.encode_value(&FieldType::Address, &TypedValue::Bool(true));
        assert!(matches!(result, Err(Error::Encoding { .. })));
    }

    #[test]
    fn test_missing_and_extra_fields_rejected() {
        let schema = mail_schema();

        let missing = StructValue::new()
            .with("from", person("Cow", "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"))
            .with("contents", "Hello");
        assert!(matches!(
            schema.struct_hash("Mail", &missing),
            Err(Error::Encoding { .. })
        ));

        let extra = mail().with("cc", "Alice");
        assert!(matches!(
            schema.struct_hash("Mail", &extra),
            Err(Error::Encoding { .. })
        ));
    }

    #[test]
    fn test_field_order_changes_hash() {
        let forward = TypeSchema::new()
            .with_type("Pair", &[("a", "uint256"), ("b", "uint256")])
            .unwrap();
        let reversed = TypeSchema::new()
            .with_type("Pair", &[("b", "uint256"), ("a", "uint256")])
            .unwrap();
        let values = StructValue::new().with("a", 1u64).with("b", 2u64);

        assert_ne!(
            forward.struct_hash("Pair", &values).unwrap(),
            reversed.struct_hash("Pair", &values).unwrap()
        );
    }

    #[test]
    fn test_typed_data_hash_layout() {
        let separator = B256::repeat_byte(0xaa);
        let struct_hash = B256::repeat_byte(0xbb);

        let mut expected = vec![0x19, 0x01];
        expected.extend_from_slice(separator.as_slice());
        expected.extend_from_slice(struct_hash.as_slice());

        assert_eq!(
            compute_typed_data_hash(separator, struct_hash),
            keccak256(&expected)
        );
    }
}
