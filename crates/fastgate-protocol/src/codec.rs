//! Codec trait and the binary implementation used on the force channel.
//!
//! A "codec" (coder/decoder) converts between [`LoginActionMessage`] and
//! raw bytes. The listener only depends on the [`Codec`] trait, so tests
//! can swap in a codec that always fails, and a future wire revision can
//! ship as a second implementation without touching the listener.

use uuid::Uuid;

use crate::{ActionType, LoginActionMessage, ProtocolError, ProxyId, MAX_NAME_LEN};

/// Encodes and decodes login-action messages.
///
/// `Send + Sync + 'static` because the codec lives in the gate's shared
/// state for the whole process lifetime.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message into bytes.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the message can't be represented on
    /// the wire (empty or over-long player name).
    fn encode(&self, message: &LoginActionMessage) -> Result<Vec<u8>, ProtocolError>;

    /// Parses bytes into a message.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] for truncated input, invalid names,
    /// unknown action types or trailing bytes.
    fn decode(&self, data: &[u8]) -> Result<LoginActionMessage, ProtocolError>;
}

// ---------------------------------------------------------------------------
// BinaryCodec
// ---------------------------------------------------------------------------

/// The fixed binary layout spoken by the proxy:
///
/// ```text
/// [u16 BE name length][name: UTF-8][u8 action type][16 bytes proxy UUID]
/// ```
///
/// ## Example
///
/// ```rust
/// use fastgate_protocol::{ActionType, BinaryCodec, Codec, LoginActionMessage, ProxyId};
///
/// let codec = BinaryCodec;
/// let msg = LoginActionMessage::new("Alice", ActionType::Login, ProxyId::random());
///
/// let bytes = codec.encode(&msg).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), msg);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn encode(&self, message: &LoginActionMessage) -> Result<Vec<u8>, ProtocolError> {
        let name = message.player_name.as_bytes();
        check_name(&message.player_name)?;

        let mut out = Vec::with_capacity(2 + name.len() + 1 + 16);
        // check_name caps the length well below u16::MAX.
        out.extend_from_slice(&(name.len() as u16).to_be_bytes());
        out.extend_from_slice(name);
        out.push(message.action.as_byte());
        out.extend_from_slice(message.proxy_id.0.as_bytes());
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<LoginActionMessage, ProtocolError> {
        let mut reader = Reader { data };

        let len_bytes: [u8; 2] = reader.take_array("name length")?;
        let name_len = u16::from_be_bytes(len_bytes) as usize;
        let name_bytes = reader.take(name_len, "player name")?;
        let player_name = std::str::from_utf8(name_bytes)
            .map_err(|_| ProtocolError::InvalidUtf8)?
            .to_string();
        check_name(&player_name)?;

        let [action_byte] = reader.take_array::<1>("action type")?;
        let action = ActionType::from_byte(action_byte)
            .ok_or(ProtocolError::UnknownAction(action_byte))?;

        let uuid_bytes: [u8; 16] = reader.take_array("proxy id")?;
        let proxy_id = ProxyId(Uuid::from_bytes(uuid_bytes));

        if !reader.data.is_empty() {
            return Err(ProtocolError::TrailingBytes(reader.data.len()));
        }

        Ok(LoginActionMessage {
            player_name,
            action,
            proxy_id,
        })
    }
}

fn check_name(name: &str) -> Result<(), ProtocolError> {
    let chars = name.chars().count();
    if chars == 0 {
        return Err(ProtocolError::EmptyName);
    }
    if chars > MAX_NAME_LEN {
        return Err(ProtocolError::NameTooLong(chars));
    }
    Ok(())
}

/// Cursor over the input. Each `take` either yields the full field or
/// fails with the field's name.
struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], ProtocolError> {
        if self.data.len() < n {
            return Err(ProtocolError::Truncated(field));
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    fn take_array<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<[u8; N], ProtocolError> {
        let bytes = self.take(N, field)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}
