use slotmpsc::{Channel, ChannelConfig, ConsumerHandle};
use std::sync::{Arc, Mutex};

const N_PRODUCERS: usize = 8;

fn main() {
    println!("slotmpsc Hello-8 Example");
    println!("=========================\n");

    println!("Configuration:");
    println!("  Producers: {N_PRODUCERS}");
    println!("  Messages: 1 per producer, 30 bytes each\n");

    let received = Arc::new(Mutex::new(Vec::new()));
    let received_cb = Arc::clone(&received);

    let channel: Channel<usize> = Channel::create(
        ChannelConfig::new(100, N_PRODUCERS),
        move |consumer, data, closed| {
            if closed {
                println!("\nconsumer closed");
                return;
            }
            let text = String::from_utf8(data.unwrap()).unwrap();
            println!("received: {text}");
            let mut seen = received_cb.lock().unwrap();
            seen.push(text);
            if seen.len() == N_PRODUCERS {
                consumer.close();
            }
        },
        None::<fn(ConsumerHandle<usize>)>,
    )
    .expect("channel creation");

    for id in 0..N_PRODUCERS {
        channel
            .register_producer(
                move |producer| {
                    let message = format!("hello from producer {id:<10}");
                    assert_eq!(message.len(), 30);
                    producer.send(message.as_bytes());
                },
                id,
            )
            .expect("register producer");
    }

    channel.join();

    println!("\nResults:");
    println!("  Messages delivered: {}", received.lock().unwrap().len());
}
