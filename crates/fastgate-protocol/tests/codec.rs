//! Integration tests for the binary codec against hostile input.

use fastgate_protocol::{
    ActionType, BinaryCodec, Codec, LoginActionMessage, ProtocolError, ProxyId,
};
use rand::Rng;

#[test]
fn test_random_payloads_never_panic_and_never_half_decode() {
    // Garbage from the channel must either be rejected or decode into a
    // message that survives re-encoding byte for byte.
    let mut rng = rand::rng();
    let codec = BinaryCodec;

    for _ in 0..2_000 {
        let len = rng.random_range(0..48);
        let payload: Vec<u8> = (0..len).map(|_| rng.random()).collect();

        if let Ok(msg) = codec.decode(&payload) {
            let again = codec.encode(&msg).expect("decoded message re-encodes");
            assert_eq!(again, payload);
        }
    }
}

#[test]
fn test_decode_accepts_multibyte_names_within_limit() {
    let msg = LoginActionMessage::new("Ærøskøbing", ActionType::Login, ProxyId::random());
    let bytes = BinaryCodec.encode(&msg).unwrap();

    assert_eq!(BinaryCodec.decode(&bytes).unwrap(), msg);
}

#[test]
fn test_declared_length_past_end_is_truncated() {
    // Length prefix says 200 bytes, only a handful follow.
    let payload = [0x00, 0xc8, b'A', b'l', b'i'];
    assert_eq!(
        BinaryCodec.decode(&payload),
        Err(ProtocolError::Truncated("player name"))
    );
}
