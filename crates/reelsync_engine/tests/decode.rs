use reelsync_engine::FrameDecoder;
use pretty_assertions::assert_eq;
use reelsync_core::StreamEvent;

const STREAM: &[u8] = b"data: {\"current\":1,\"total\":5}\n\
\n\
data: {\"current\":3,\"total\":5,\"processed\":2,\"skipped\":0,\"removed\":1}\n\
data: {\"done\":true,\"message\":\"Imported \\u00e9l\\u00e9phant\",\"processed\":5,\"removed\":1}\n";

fn decode_chunks(chunks: &[&[u8]]) -> Vec<StreamEvent> {
    let mut decoder = FrameDecoder::new();
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(decoder.push(chunk));
    }
    events.extend(decoder.finish());
    events
}

fn init_logging() {
    sync_logging::initialize_for_tests();
}

#[test]
fn whole_stream_decodes_to_three_events() {
    init_logging();
    let events = decode_chunks(&[STREAM]);
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], StreamEvent::Progress(_)));
    assert!(matches!(events[2], StreamEvent::Done(_)));
}

#[test]
fn decoding_is_invariant_under_any_chunk_boundary() {
    init_logging();
    let baseline = decode_chunks(&[STREAM]);
    for split in 1..STREAM.len() {
        let events = decode_chunks(&[&STREAM[..split], &STREAM[split..]]);
        assert_eq!(events, baseline, "split at byte {split}");
    }
}

#[test]
fn decoding_is_invariant_under_byte_at_a_time_delivery() {
    init_logging();
    let baseline = decode_chunks(&[STREAM]);
    let bytes: Vec<&[u8]> = STREAM.chunks(1).collect();
    assert_eq!(decode_chunks(&bytes), baseline);
}

#[test]
fn events_are_never_parsed_twice_across_pushes() {
    let mut decoder = FrameDecoder::new();
    let first = decoder.push(b"data: {\"current\":1,\"total\":2}\ndata: {\"cur");
    assert_eq!(first.len(), 1);
    let second = decoder.push(b"rent\":2,\"total\":2}\n");
    assert_eq!(second.len(), 1);
    assert!(decoder.finish().is_none());
}
