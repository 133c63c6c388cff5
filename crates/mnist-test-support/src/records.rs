use mnist_protocol::MNIST_PIXELS;

/// A complete record line with every pixel set to `pixel`.
pub fn record_line(label: u8, pixel: u8) -> String {
    record_line_with(label, &[pixel; MNIST_PIXELS])
}

/// A record line from explicit pixel values (any count, for negative tests).
pub fn record_line_with(label: u8, pixels: &[u8]) -> String {
    let mut line = label.to_string();
    for p in pixels {
        line.push(',');
        line.push_str(&p.to_string());
    }
    line
}
