//! Timer-bank namespaces for motors, servos, and the LED strip.

use pinmux_core::{OutputFamily, ResourceType};
use pinmux_resolve::{ResolvedBoard, TimerBank};

use crate::emit::Emitter;
use crate::sections::{pin_expr, placeholders};

fn namespace(family: OutputFamily) -> &'static str {
    match family {
        OutputFamily::Motor => "Motor",
        OutputFamily::Servo => "Servo",
        OutputFamily::LedStrip => "LedStrip",
    }
}

fn plural(family: OutputFamily) -> &'static str {
    match family {
        OutputFamily::Motor => "Motors",
        OutputFamily::Servo => "Servos",
        OutputFamily::LedStrip => "LED strip",
    }
}

fn variable(family: OutputFamily) -> &'static str {
    match family {
        OutputFamily::Motor => "motor",
        OutputFamily::Servo => "servo",
        OutputFamily::LedStrip => "led_strip",
    }
}

/// One family namespace holding every bank that drives it.
pub(crate) fn family(out: &mut Emitter, board: &ResolvedBoard, family: OutputFamily) {
    let resource = ResourceType::Timer(family);
    let banks: Vec<&TimerBank> = board.banks_for(family).collect();
    if banks.is_empty() {
        if !board.dropped_of(&resource).is_empty() {
            placeholders(out, board, &resource);
        }
        return;
    }

    let timing = board.timings.of(family);
    out.line(format!("// {}: {} protocol", plural(family), timing.protocol));
    out.open(format!("namespace {} {{", namespace(family)));
    out.line(format!("static constexpr uint32_t frequency_hz = {};", timing.frequency_hz));
    out.blank();
    placeholders(out, board, &resource);

    for bank in banks {
        let indices: Vec<String> = bank
            .channels_of(family)
            .map(|c| c.index().to_string())
            .collect();
        out.line(format!("// {} Bank: {} {}", bank.instance, plural(family), indices.join(", ")));
        out.open(format!("namespace {}_Bank {{", bank.instance));
        out.line(format!("static inline TIM_TypeDef* const timer = {};", bank.instance));
        out.blank();
        out.open("struct Channel {");
        for field in ["pin", "ch", "min_us", "max_us"] {
            out.line(format!("uint32_t {field};"));
        }
        out.close("};");
        out.blank();

        for channel in bank.channels_of(family) {
            let Some(entry) = channel.entry() else {
                continue;
            };
            out.line(format!(
                "static constexpr Channel {}{} = {{{}, {}, {}, {}}};  // {}",
                variable(family),
                channel.index(),
                pin_expr(Some(channel)),
                entry.timer_channel().unwrap_or_default(),
                timing.min_us,
                timing.max_us,
                entry.label()
            ));
        }
        out.close("};");
        out.blank();
    }
    out.close("};");
    out.blank();
}
