use crate::engines::generation::genome::Genome;

/// Sorts by descending fitness and records each genome's 1-based rank.
/// Equal fitnesses keep their population order.
pub fn rank(mut scored: Vec<(Genome, f64)>) -> Vec<(Genome, f64)> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (ix, (genome, _)) in scored.iter_mut().enumerate() {
        genome.set_rank(ix + 1);
    }
    scored
}

/// Survivors kept out of a population of `size`.
pub fn survivors(size: usize) -> usize {
    size * 7 / 10
}

/// Keeps the top 70% of a ranked population.
pub fn cull(ranked: Vec<(Genome, f64)>, size: usize) -> Vec<Genome> {
    ranked
        .into_iter()
        .take(survivors(size))
        .map(|(genome, _)| genome)
        .collect()
}

/// Oversamples the elite of a culled population back up to `size`.
///
/// The pool is the top 2%, the top 3%, the top 25% twice, and then as
/// many more as needed taken in order from the 25% mark of `culled`,
/// wrapping to its start if it runs out.
pub fn breeding_pool(culled: &[Genome], size: usize) -> Vec<Genome> {
    if culled.is_empty() {
        return Vec::new();
    }

    let quarter = size / 4;
    let bands = [size * 2 / 100, size * 3 / 100, quarter, quarter];

    let mut pool = Vec::with_capacity(size);
    for band in bands {
        pool.extend(culled.iter().take(band).cloned());
    }

    let start = quarter % culled.len();
    let remainder = size.saturating_sub(pool.len());
    pool.extend(culled.iter().cycle().skip(start).take(remainder).cloned());
    pool
}
