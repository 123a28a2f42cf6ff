use midir::{MidiInput, MidiOutput};

pub fn midi() -> anyhow::Result<()> {
    println!("=== MIDI Output Devices ===");
    let midi_out = MidiOutput::new("boplicity-enumerate")?;
    let ports = midi_out.ports();
    if ports.is_empty() {
        println!("  (none found)");
    }
    for port in &ports {
        let name = midi_out.port_name(port).unwrap_or_else(|_| "Unknown".into());
        println!("  {name}");
    }
    println!();

    println!("=== MIDI Input Devices (gesture controllers) ===");
    let midi_in = MidiInput::new("boplicity-enumerate")?;
    let ports = midi_in.ports();
    if ports.is_empty() {
        println!("  (none found)");
    }
    for port in &ports {
        let name = midi_in.port_name(port).unwrap_or_else(|_| "Unknown".into());
        println!("  {name}");
    }
    Ok(())
}
