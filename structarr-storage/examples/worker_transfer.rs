//! Hand off vertex arrays between threads.
//! The main thread fills line vertex arrays and transfers their buffers
//! to worker threads, which compute bounding boxes and send the buffers back.
//! Its goal is to measure round trips of buffer ownership without copy.
use clap::Parser;
use std::time::Instant;
use structarr_storage::{struct_array, SerializedStructArray};

struct_array! {
    pub struct LineVertexArray(align = 4) {
        a_pos: i16[2],
        a_data: u8[4],
        a_linesofar: f32,
    }
    element LineVertex, LineVertexMut;
}

fn main() {
    let args = Args::parse();
    let (task_tx, task_rx) = flume::bounded::<SerializedStructArray>(args.threads * 2);
    let (res_tx, res_rx) = flume::unbounded::<(SerializedStructArray, [i16; 4])>();
    let start = Instant::now();
    let mut handles = vec![];
    for _ in 0..args.threads {
        let task_rx = task_rx.clone();
        let res_tx = res_tx.clone();
        let handle = std::thread::spawn(move || worker(task_rx, res_tx));
        handles.push(handle);
    }
    drop(task_rx);
    drop(res_tx);

    let producer = {
        let (count, vertices) = (args.count, args.vertices);
        std::thread::spawn(move || {
            for round in 0..count {
                let ser = build(round, vertices).into_serialized().unwrap();
                task_tx.send(ser).unwrap();
            }
        })
    };

    let mut total_vertices = 0;
    let mut bbox = [i16::MAX, i16::MAX, i16::MIN, i16::MIN];
    for (ser, b) in res_rx.iter() {
        let arr = LineVertexArray::deserialize(ser).unwrap();
        total_vertices += arr.len();
        bbox = [
            bbox[0].min(b[0]),
            bbox[1].min(b[1]),
            bbox[2].max(b[2]),
            bbox[3].max(b[3]),
        ];
    }
    producer.join().unwrap();
    let mut processed = 0;
    for handle in handles {
        processed += handle.join().unwrap();
    }
    let dur = start.elapsed();
    println!(
        "{:?} arrays with {:?} vertices cost {:?} microseconds, avg {:?} arrays/s, bbox {:?}",
        processed,
        total_vertices,
        dur.as_micros(),
        processed as f64 * 1_000_000_000f64 / dur.as_nanos() as f64,
        bbox
    );
}

#[inline]
fn build(round: usize, vertices: usize) -> LineVertexArray {
    let mut arr = LineVertexArray::new().unwrap();
    arr.reserve(vertices).unwrap();
    for i in 0..vertices {
        let x = ((round * 31 + i) % 8192) as i16;
        let y = ((round * 17 + i * 3) % 8192) as i16;
        arr.emplace_back([x, y], [0, 1, (i % 256) as u8, 0], i as f32)
            .unwrap();
    }
    arr
}

#[inline]
fn worker(
    task_rx: flume::Receiver<SerializedStructArray>,
    res_tx: flume::Sender<(SerializedStructArray, [i16; 4])>,
) -> usize {
    let mut count = 0;
    for ser in task_rx.iter() {
        let arr = LineVertexArray::deserialize(ser).unwrap();
        let mut bbox = [i16::MAX, i16::MAX, i16::MIN, i16::MIN];
        for i in 0..arr.len() {
            let [x, y] = arr.get(i).unwrap().a_pos();
            bbox = [bbox[0].min(x), bbox[1].min(y), bbox[2].max(x), bbox[3].max(y)];
        }
        res_tx.send((arr.into_serialized().unwrap(), bbox)).unwrap();
        count += 1;
    }
    count
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// thread number to process arrays
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Number of arrays to transfer
    #[arg(short, long, default_value = "10000")]
    count: usize,

    /// Number of vertices in each array
    #[arg(short, long, default_value = "1000")]
    vertices: usize,
}
