use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use flowgen::{AppResult, FlowBuffer, FlowRequest, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Binds an ephemeral port, runs the accept loop in the background, and
/// returns the address clients should connect to.
async fn start_server(flow_buffer_size: usize) -> AppResult<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = Server::new(
        listener,
        Arc::new(Semaphore::new(16)),
        FlowBuffer::new(flow_buffer_size),
        4 * 1024,
    );
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    Ok(addr)
}

/// One full request/echo/flow cycle: sends `(index, size)`, asserts the echo
/// is byte-identical to the request, then drains exactly `size` flow bytes.
async fn exchange(stream: &mut TcpStream, index: u32, size: u32) -> AppResult<()> {
    let header = FlowRequest { index, size }.encode();
    stream.write_all(&header).await?;

    let mut echo = [0u8; 8];
    stream.read_exact(&mut echo).await?;
    assert_eq!(echo, header);

    let mut remaining = size as usize;
    let mut buf = vec![0u8; 64 * 1024];
    while remaining > 0 {
        let want = remaining.min(buf.len());
        stream.read_exact(&mut buf[..want]).await?;
        remaining -= want;
    }
    Ok(())
}

#[tokio::test]
async fn test_flow_then_zero_size_then_next_request() -> AppResult<()> {
    let addr = start_server(8 * 1024).await?;
    let mut stream = TcpStream::connect(addr).await?;

    timeout(TEST_TIMEOUT, async {
        exchange(&mut stream, 1, 1000).await?;
        // size = 0 is valid: echo, zero flow bytes, connection stays open
        exchange(&mut stream, 2, 0).await?;
        // the next echo arriving as the very next 8 bytes proves the
        // zero-size flow sent nothing extra
        exchange(&mut stream, 3, 5).await
    })
    .await
    .expect("exchange timed out")
}

#[tokio::test]
async fn test_flow_sizes_around_buffer_capacity() -> AppResult<()> {
    let addr = start_server(8 * 1024).await?;
    let mut stream = TcpStream::connect(addr).await?;

    timeout(TEST_TIMEOUT, async {
        // below, at, and just above the chunk size, plus a many-chunk flow
        for (index, size) in [(1, 1), (2, 8191), (3, 8192), (4, 8193), (5, 100_000)] {
            exchange(&mut stream, index, size).await?;
        }
        Ok(())
    })
    .await
    .expect("exchange timed out")
}

#[tokio::test]
async fn test_header_sent_byte_at_a_time() -> AppResult<()> {
    let addr = start_server(8 * 1024).await?;
    let mut stream = TcpStream::connect(addr).await?;

    let header = FlowRequest {
        index: 11,
        size: 64,
    }
    .encode();

    timeout(TEST_TIMEOUT, async {
        for byte in header {
            stream.write_all(&[byte]).await?;
            stream.flush().await?;
        }

        let mut echo = [0u8; 8];
        stream.read_exact(&mut echo).await?;
        assert_eq!(echo, header);

        let mut flow = [0u8; 64];
        stream.read_exact(&mut flow).await?;
        Ok(())
    })
    .await
    .expect("exchange timed out")
}

#[tokio::test]
async fn test_large_flow_does_not_block_other_connection() -> AppResult<()> {
    let addr = start_server(8 * 1024).await?;

    // client A requests a large flow and does not read it yet, so the
    // server's send loop stalls on A's full socket buffers
    let mut slow = TcpStream::connect(addr).await?;
    let large = FlowRequest {
        index: 7,
        size: 5_000_000,
    };
    slow.write_all(&large.encode()).await?;

    // client B's exchange completes while A's transfer is in progress
    let mut quick = TcpStream::connect(addr).await?;
    timeout(TEST_TIMEOUT, exchange(&mut quick, 8, 10))
        .await
        .expect("quick client blocked behind large flow")?;

    // now drain A: echo plus exactly 5_000_000 bytes
    timeout(TEST_TIMEOUT, async {
        let mut echo = [0u8; 8];
        slow.read_exact(&mut echo).await?;
        assert_eq!(echo, large.encode());

        let mut remaining = 5_000_000usize;
        let mut buf = vec![0u8; 64 * 1024];
        while remaining > 0 {
            let want = remaining.min(buf.len());
            slow.read_exact(&mut buf[..want]).await?;
            remaining -= want;
        }
        // connection still serves further requests after a large flow
        exchange(&mut slow, 9, 1).await
    })
    .await
    .expect("draining large flow timed out")
}

#[tokio::test]
async fn test_abrupt_close_mid_header_leaves_others_unaffected() -> AppResult<()> {
    let addr = start_server(8 * 1024).await?;

    let mut doomed = TcpStream::connect(addr).await?;
    let mut healthy = TcpStream::connect(addr).await?;

    // three bytes of a header, then gone
    doomed.write_all(&[0x01, 0x02, 0x03]).await?;
    doomed.flush().await?;
    drop(doomed);

    timeout(TEST_TIMEOUT, exchange(&mut healthy, 21, 2048))
        .await
        .expect("healthy connection affected by aborted one")
}

#[tokio::test]
async fn test_accepts_new_connections_after_close() -> AppResult<()> {
    let addr = start_server(8 * 1024).await?;

    timeout(TEST_TIMEOUT, async {
        let mut first = TcpStream::connect(addr).await?;
        exchange(&mut first, 1, 100).await?;
        drop(first);

        let mut second = TcpStream::connect(addr).await?;
        exchange(&mut second, 2, 100).await
    })
    .await
    .expect("exchange timed out")
}

#[tokio::test]
async fn test_echo_is_byte_identical_for_extreme_values() -> AppResult<()> {
    let addr = start_server(8 * 1024).await?;
    let mut stream = TcpStream::connect(addr).await?;

    timeout(TEST_TIMEOUT, async {
        exchange(&mut stream, u32::MAX, 0).await?;
        exchange(&mut stream, 0, 1).await
    })
    .await
    .expect("exchange timed out")
}
