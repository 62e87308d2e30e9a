use crate::editor::{Editor, Mode};

pub fn default_keybinds(editor: &mut Editor) {
    add_keybind!(editor, "n", "h", |e| {
        e.move_left();
        Ok(())
    });

    add_keybind!(editor, "n", "j", |e| {
        e.move_down();
        Ok(())
    });

    add_keybind!(editor, "n", "k", |e| {
        e.move_up();
        Ok(())
    });

    add_keybind!(editor, "n", "l", |e| {
        e.move_right();
        Ok(())
    });

    add_keybind!(editor, "n", "i", |e| {
        e.mode = Mode::INSERT;
        Ok(())
    });

    add_keybind!(editor, "n", "a", |e| {
        e.move_right();
        e.mode = Mode::INSERT;
        Ok(())
    });

    add_keybind!(editor, "n", ":", |e| {
        e.mode = Mode::COMMAND;
        Ok(())
    });

    add_keybind!(editor, "ic", "<Esc>", |e| {
        e.mode = Mode::NORMAL;
        e.command.clear();
        Ok(())
    });

    add_keybind!(editor, "n", "<CR>", |e| {
        if e.error.is_some() {
            e.error = None;
        }

        Ok(())
    });

    add_keybind!(editor, "n", "x", |e| {
        e.delete_under_cursor();
        Ok(())
    });

    add_keybind!(editor, "n", "dd", |e| {
        e.delete_line();
        Ok(())
    });

    add_keybind!(editor, "n", "o", |e| {
        e.open_line_below();
        Ok(())
    });

    add_keybind!(editor, "n", "O", |e| {
        e.open_line_above();
        Ok(())
    });

    add_keybind!(editor, "n", "$", |e| {
        e.move_line_end();
        Ok(())
    });

    add_keybind!(editor, "n", "_", |e| {
        e.move_first_nonblank();
        Ok(())
    });

    add_keybind!(editor, "n", "gg", |e| {
        e.move_buffer_start();
        Ok(())
    });

    add_keybind!(editor, "n", "G", |e| {
        e.move_buffer_end();
        Ok(())
    });

    add_keybind!(editor, "n", "<C-q>", |e| {
        e.stop = true;
        Ok(())
    });

    add_keybind!(editor, "c", "<CR>", |e| e.execute_command());
}
