/// Mean of the temperature readings in the current window, if any exist.
pub fn mean_temperature(temps: &[f64]) -> Option<f64> {
    if temps.is_empty() {
        return None;
    }
    Some(temps.iter().sum::<f64>() / temps.len() as f64)
}

/// Simple moving average; inputs shorter than the window pass through
/// unchanged. The output has `len - window + 1` points otherwise.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.len() < window {
        return values.to_vec();
    }
    let mut out = Vec::with_capacity(values.len() - window + 1);
    let mut acc: f64 = values[..window].iter().sum();
    out.push(acc / window as f64);
    for i in window..values.len() {
        acc += values[i] - values[i - window];
        out.push(acc / window as f64);
    }
    out
}
