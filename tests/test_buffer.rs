use lantern::http::buffer::StreamBuffer;
use lantern::http::parser::parse_request_head;

const REQUEST: &[u8] = b"GET /docs/index.html HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n";

/// Feeds `input` in `chunk`-sized pieces and collects every head framed.
fn frame_in_chunks(input: &[u8], chunk: usize) -> Vec<Vec<u8>> {
    let mut buffer = StreamBuffer::new();
    let mut heads = Vec::new();

    for piece in input.chunks(chunk) {
        buffer.feed(piece);
        while let Some(head) = buffer.try_extract_head() {
            heads.push(head.bytes.to_vec());
        }
    }

    heads
}

#[test]
fn test_no_head_without_boundary() {
    let mut buffer = StreamBuffer::new();
    buffer.feed(b"GET / HTTP/1.1\r\nHost: example.com\r\n");

    assert!(buffer.try_extract_head().is_none());
    assert_eq!(buffer.len(), 35);
}

#[test]
fn test_extract_reports_consumed_bytes() {
    let mut buffer = StreamBuffer::new();
    buffer.feed(REQUEST);

    let head = buffer.try_extract_head().unwrap();
    assert_eq!(head.consumed, REQUEST.len());
    assert_eq!(head.bytes.len(), REQUEST.len() - 4);
    assert!(buffer.is_empty());
}

#[test]
fn test_framing_independent_of_read_size() {
    let expected = parse_request_head(&frame_in_chunks(REQUEST, REQUEST.len())[0]).unwrap();

    for chunk in [1, 2, 3, 4, 5, 7, 16, 1024] {
        let heads = frame_in_chunks(REQUEST, chunk);
        assert_eq!(heads.len(), 1, "chunk size {}", chunk);

        let parsed = parse_request_head(&heads[0]).unwrap();
        assert_eq!(parsed, expected, "chunk size {}", chunk);
    }
}

#[test]
fn test_boundary_split_across_every_position() {
    for split in 1..REQUEST.len() {
        let mut buffer = StreamBuffer::new();

        buffer.feed(&REQUEST[..split]);
        let early = buffer.try_extract_head();
        buffer.feed(&REQUEST[split..]);
        let head = early.or_else(|| buffer.try_extract_head());

        assert_eq!(
            head.map(|h| h.bytes.len()),
            Some(REQUEST.len() - 4),
            "split at {}",
            split
        );
    }
}

#[test]
fn test_back_to_back_requests_not_merged() {
    let second = b"GET /two HTTP/1.1\r\nHost: b\r\n\r\n";
    let mut input = REQUEST.to_vec();
    input.extend_from_slice(second);

    let mut buffer = StreamBuffer::new();
    buffer.feed(&input);

    let first = buffer.try_extract_head().unwrap();
    assert_eq!(&first.bytes[..], &REQUEST[..REQUEST.len() - 4]);
    assert_eq!(buffer.len(), second.len());

    let next = buffer.try_extract_head().unwrap();
    assert_eq!(&next.bytes[..], &second[..second.len() - 4]);
    assert!(buffer.is_empty());
    assert!(buffer.try_extract_head().is_none());
}

#[test]
fn test_back_to_back_requests_any_chunking() {
    let mut input = REQUEST.to_vec();
    input.extend_from_slice(b"GET /two HTTP/1.1\r\n\r\n");

    for chunk in [1, 3, 10, input.len()] {
        let heads = frame_in_chunks(&input, chunk);
        let paths: Vec<String> = heads
            .iter()
            .map(|h| parse_request_head(h).unwrap().path)
            .collect();

        assert_eq!(paths, vec!["/docs/index.html", "/two"], "chunk size {}", chunk);
    }
}

#[test]
fn test_remainder_kept_after_extract() {
    let mut buffer = StreamBuffer::new();
    buffer.feed(b"GET / HTTP/1.1\r\n\r\nGET /par");

    buffer.try_extract_head().unwrap();
    assert_eq!(buffer.len(), 8);
    assert!(buffer.try_extract_head().is_none());

    buffer.feed(b"tial HTTP/1.1\r\n\r\n");
    let head = buffer.try_extract_head().unwrap();
    assert_eq!(&head.bytes[..], b"GET /partial HTTP/1.1");
}

#[test]
fn test_take_exact_body() {
    let mut buffer = StreamBuffer::new();
    buffer.feed(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel");

    buffer.try_extract_head().unwrap();
    assert!(buffer.take(5).is_none());
    assert_eq!(buffer.len(), 3);

    buffer.feed(b"loGET");
    assert_eq!(&buffer.take(5).unwrap()[..], b"hello");
    assert_eq!(buffer.len(), 3);
}
