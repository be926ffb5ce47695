use keel_codec::Transcoder;
use keel_types::{Fields, Namespaced, Oid, TypeError, Value};

use crate::error::{KeelError, KeelResult};

/// Reserved field under which a record's own identifier is stored in its
/// payload.
pub const OID_FIELD: &str = "__oid__";

/// A record type that can be persisted.
///
/// Records are plain data: they expose their field state as [`Fields`] and
/// are rebuilt from it with [`from_fields`](Entity::from_fields). The store
/// never runs any other construction logic. The identity is `None` until the
/// first save assigns one.
pub trait Entity: Namespaced + Sized {
    /// The identifier assigned at first save, if any.
    fn oid(&self) -> Option<&Oid>;

    /// Attach the identifier assigned by the store.
    fn set_oid(&mut self, oid: Oid);

    /// The record's current field state.
    fn to_fields(&self) -> Fields;

    /// Rebuild a record from stored field state.
    fn from_fields(oid: Oid, fields: &Fields) -> Result<Self, TypeError>;
}

/// A loaded record whose type is not known statically.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub oid: Oid,
    pub fields: Fields,
}

impl Record {
    /// Encode `fields` as the payload of the record identified by `oid`.
    pub(crate) fn encode(oid: &Oid, mut fields: Fields) -> KeelResult<String> {
        if fields.contains(OID_FIELD) {
            return Err(KeelError::InvalidArgument(format!(
                "field name {OID_FIELD:?} is reserved"
            )));
        }
        fields.insert(OID_FIELD, Value::Oid(oid.clone()));
        Transcoder::encode_fields(&fields).map_err(|e| KeelError::from_codec(oid, e))
    }

    /// Decode the payload stored in `oid`'s slot.
    ///
    /// An embedded identifier must agree with the slot; payloads written
    /// without one take the slot's identity.
    pub(crate) fn decode(oid: Oid, payload: &str) -> KeelResult<Self> {
        let mut fields =
            Transcoder::decode_fields(payload).map_err(|e| KeelError::from_codec(&oid, e))?;
        match fields.remove(OID_FIELD) {
            None => {}
            Some(Value::Oid(embedded)) if embedded == oid => {}
            Some(other) => {
                return Err(KeelError::malformed(
                    &oid,
                    format!("embedded identity {other:?} does not match its slot"),
                ));
            }
        }
        Ok(Self { oid, fields })
    }

    /// Rebuild a typed record.
    pub fn into_entity<T: Entity>(self) -> KeelResult<T> {
        T::from_fields(self.oid.clone(), &self.fields)
            .map_err(|e| KeelError::malformed(&self.oid, e))
    }
}
