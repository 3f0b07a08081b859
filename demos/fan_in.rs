use anyhow::Result;
use batchpipe::{BatchingBuffer, Capacity};
use futures::StreamExt;
use tokio::time::{sleep, Duration};

/// Several producers feed one bounded buffer; a single consumer reads the
/// merged output as a stream of batches of at most 4 values.
#[tokio::main]
async fn main() -> Result<()> {
    let buffer = BatchingBuffer::new(Capacity::Bounded(4))?;

    let mut producers = Vec::new();
    for name in ["sensor-a", "sensor-b", "sensor-c"] {
        let writer = buffer.clone();
        producers.push(tokio::spawn(async move {
            for i in 1..=5 {
                writer.submit(format!("{} reading {}", name, i)).await.unwrap();
                sleep(Duration::from_millis(20)).await;
            }
        }));
    }

    let closer = buffer.clone();
    tokio::spawn(async move {
        for producer in producers {
            let _ = producer.await;
        }
        closer.close().await.unwrap();
    });

    let stream = buffer.into_stream();
    futures::pin_mut!(stream);

    let mut total = 0;
    while let Some(batch) = stream.next().await {
        total += batch.len();
        println!("batch ({} values): {:?}", batch.len(), batch);
    }
    println!("delivered {} readings in total", total);

    Ok(())
}
