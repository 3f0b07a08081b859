use anyhow::Result;
use batchpipe::{BatchingBuffer, Capacity};
use tokio::time::{sleep, Duration};

/// Fast producer, slow consumer: the buffer absorbs the speed gap and the
/// consumer picks up everything that accumulated since its last read.
#[tokio::main]
async fn main() -> Result<()> {
    let buffer = BatchingBuffer::new(Capacity::Unbounded)?;

    let writer = buffer.clone();
    let producer = tokio::spawn(async move {
        for i in 1..=20 {
            writer.submit(format!("event #{}", i)).await.unwrap();
            sleep(Duration::from_millis(10)).await;
        }
        writer.close().await.unwrap();
    });

    // Consumer polls every 50ms, so each read collects ~5 events.
    while let Some(batch) = buffer.receive().await {
        println!("received batch of {}: {:?}", batch.len(), batch);
        sleep(Duration::from_millis(50)).await;
    }
    println!("end of stream");

    producer.await?;
    Ok(())
}
