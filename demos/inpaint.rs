use patch_relax as pr;
use std::path::Path;

fn main() -> Result<(), pr::Error> {
    // pixels equal to 255 are the holes, everything else can be copied from.
    // with no argument, a striped image with a hole in the middle is used
    let arg = std::env::args().nth(1);
    let builder = match &arg {
        Some(path) => pr::Session::builder().image(pr::ImageSource::Path(Path::new(path))),
        None => {
            let mut img = pr::PixelGrid::filled(pr::Dims::square(64), 0.0);
            for y in 0..64 {
                for x in 0..64 {
                    let hole = (24..40).contains(&x) && (28..36).contains(&y);
                    img.set(x, y, if hole { 255.0 } else { ((x + y) % 8) as f32 * 30.0 });
                }
            }
            pr::Session::builder().pixels(img)
        }
    };

    let session = builder
        // search a 9x9 window around every hole pixel, scoring patches with
        // both the known and the synthesized neighbors
        .variant(pr::Variant::CODEBOOK_PROBABILISTIC)
        .neighborhood_size(4)
        .nb_iterations(20)
        .premature_stop(true)
        .window_size(5)
        .gap_percentage(0.01)
        .build()?;

    println!(
        "filling {} pixels from {} candidates",
        session.masked_count(),
        session.source_count()
    );

    let inpainted = session.run(Some(Box::new(|update: pr::ProgressUpdate<'_>| {
        println!(
            "pass {}/{} energy {:.1} ratio {:.4}",
            update.passes.current, update.passes.total, update.record.energy, update.record.ratio
        );
    })))?;

    println!("{:?}", inpainted.outcome());

    //save the result to the disk
    inpainted.save("out/inpaint.png")
}
