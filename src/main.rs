use stress_test::{stress_test_memory, stress_test_protocol, stress_test_scaling};
pub mod stress_test;

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start runtime: {}", err);
            std::process::exit(1);
        }
    };
    let converged = rt.block_on(async_main());
    if !converged {
        std::process::exit(1);
    }
}

async fn async_main() -> bool {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            ASYNC STRESS TESTS                               ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut converged = true;

    // Test 1: in-process log, small scale
    let stats = stress_test_memory(4, 50, 200).await;
    stats.print();
    converged &= stats.converged;

    // Test 2: encoded protocol, small scale
    let stats = stress_test_protocol(4, 50, 200).await;
    stats.print();
    converged &= stats.converged;

    // Test 3: in-process log, medium scale
    let stats = stress_test_memory(10, 200, 1000).await;
    stats.print();
    converged &= stats.converged;

    // Test 4: scaling analysis
    stress_test_scaling(12, 4).await;

    if converged {
        println!("\n✓ All stress tests converged!");
    } else {
        println!("\n✗ Sessions diverged");
    }
    converged
}
